// # Static Segment Source
//
// In-memory implementation of SegmentSource.
//
// ## Purpose
//
// Lets an embedding application hand segment lines to the resolver
// directly, e.g. when they arrive from a config service rather than from
// files. Lines can be replaced at runtime; the next refresh picks them up.
//
// ## When to Use
//
// - Testing environments
// - Applications with their own configuration channel

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::Error;
use crate::family::AddressFamily;
use crate::traits::SegmentSource;

/// In-memory segment source
///
/// A family that was never given any lines is reported as unavailable, so
/// the resolver keeps whatever it published before.
///
/// # Example
///
/// ```rust,no_run
/// use idc_core::source::StaticSegmentSource;
/// use idc_core::traits::SegmentSource;
/// use idc_core::AddressFamily;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = StaticSegmentSource::new();
///     source.set_lines(AddressFamily::V4, ["10.0.0.0/8 lf"]);
///
///     let lines = source.load(AddressFamily::V4).await?;
///     assert_eq!(lines, vec!["10.0.0.0/8 lf"]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSegmentSource {
    inner: Arc<RwLock<HashMap<AddressFamily, Vec<String>>>>,
}

impl StaticSegmentSource {
    /// Create a source with no lines for either family
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source with IPv4 and IPv6 lines
    pub fn with_lines<I, J, S, T>(v4: I, v6: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let source = Self::new();
        source.set_lines(AddressFamily::V4, v4);
        source.set_lines(AddressFamily::V6, v6);
        source
    }

    /// Replace the lines of a family
    pub fn set_lines<I, S>(&self, family: AddressFamily, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines.into_iter().map(Into::into).collect();
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(family, lines);
    }

    /// Forget the lines of a family, making it unavailable
    pub fn clear(&self, family: AddressFamily) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.remove(&family);
    }
}

#[async_trait]
impl SegmentSource for StaticSegmentSource {
    async fn load(&self, family: AddressFamily) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&family).cloned().ok_or_else(|| {
            Error::source_unavailable(format!("No {} lines configured", family))
        })
    }

    fn source_name(&self) -> &str {
        "static"
    }
}
