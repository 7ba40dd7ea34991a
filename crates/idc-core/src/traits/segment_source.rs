// # Segment Source Trait
//
// Defines where segment lines come from.
//
// ## Implementations
//
// - File-based (agent file + local file per family): `FileSegmentSource`
// - In-memory, replaceable at runtime: `StaticSegmentSource`
//
// ## Usage
//
// ```rust,ignore
// use idc_core::{AddressFamily, SegmentSource};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* SegmentSource implementation */;
//
//     let lines = source.load(AddressFamily::V4).await?;
//     println!("{} ipv4 segment lines", lines.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::family::AddressFamily;

/// Trait for segment source implementations
///
/// A source only produces raw text lines; parsing, deduplication,
/// flattening and publication all belong to the
/// [`IdcResolver`](crate::IdcResolver).
///
/// # Contract
///
/// - `Ok(lines)` means the source was readable. An empty vector is a valid
///   answer and publishes an empty table.
/// - `Err(_)` means the source could not be read at all. The resolver
///   keeps serving the previously published table and retries on the next
///   refresh cycle.
/// - Implementations must not spawn background tasks or cache across
///   calls; the resolver owns the refresh schedule.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Load all segment lines for one address family, in priority order
    ///
    /// Earlier lines win over later lines that repeat the same CIDR text.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: The raw lines
    /// - `Err(Error)`: The source is unavailable
    async fn load(&self, family: AddressFamily) -> Result<Vec<String>, crate::Error>;

    /// Human-readable name used in logs
    fn source_name(&self) -> &str;
}
