// # idc-core
//
// Core library for resolving IP addresses to the datacenter (IDC) that
// owns them.
//
// ## Architecture Overview
//
// - **SegmentSource**: Trait for loading `"<CIDR> <label>"` lines
// - **segment**: Parsing, flattening and merging lines into a table
// - **SegmentTable**: Sorted, non-overlapping ranges with binary-search lookup
// - **RegionMap**: IDC to region catalogue
// - **IdcResolver**: Publishes tables atomically and refreshes them on a timer
//
// ## Design Principles
//
// 1. **Lock-free reads**: Lookups load one published snapshot and never wait
// 2. **Whole-table replacement**: A refresh builds a new table and swaps it in
// 3. **Most specific wins**: Nested ranges are flattened so the innermost label applies
// 4. **Keep last good**: An unreadable source never clears a published table
// 5. **Library-First**: The daemon is a thin shell over this crate

pub mod config;
pub mod error;
pub mod family;
pub mod region;
pub mod resolver;
pub mod segment;
pub mod source;
pub mod traits;

// Re-export core types for convenience
pub use config::{ResolverConfig, SegmentFiles, SourcesConfig};
pub use error::{Error, Result};
pub use family::{AddressFamily, SegmentAddr};
pub use region::{RegionMap, UNKNOWN_REGION};
pub use resolver::{IdcResolver, RefreshTask, ResolverEvent, ResolverStats, TableSnapshot};
pub use segment::{Datacenter, Segment, SegmentTable, UNKNOWN_IDC};
pub use source::{FileSegmentSource, StaticSegmentSource};
pub use traits::SegmentSource;
