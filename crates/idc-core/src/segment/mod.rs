// # Segments
//
// A segment is an inclusive address range tagged with one IDC label.
//
// ## Pipeline
//
// ```text
// lines ──► loader ──► flatten ──► merge ──► SegmentTable
//           (dedup)    (disjoint)  (coalesce)  (binary search)
// ```
//
// The whole pipeline is generic over [`SegmentAddr`], so IPv4 (`u32`)
// and IPv6 (`u128`) tables share one implementation.

pub mod flatten;
pub mod loader;
pub mod table;

pub use flatten::{flatten, merge};
pub use loader::{RawRecord, load_segments, parse_records};
pub use table::SegmentTable;

use crate::family::SegmentAddr;
use std::fmt;
use std::sync::Arc;

/// Marker returned for addresses outside every configured segment
pub const UNKNOWN_IDC: &str = "-";

/// Shared IDC label
pub type Label = Arc<str>;

/// Inclusive address range tagged with an IDC label
///
/// Invariant: `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<A> {
    /// First address covered
    pub start: A,
    /// Last address covered
    pub end: A,
    /// IDC label
    pub label: Label,
}

impl<A: SegmentAddr> Segment<A> {
    /// Create a segment; bounds are swapped if given in reverse
    pub fn new(start: A, end: A, label: impl Into<Label>) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Whether `addr` falls inside this segment
    pub fn contains(&self, addr: A) -> bool {
        self.start <= addr && addr <= self.end
    }
}

impl<A: SegmentAddr> fmt::Display for Segment<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} - {}] {}",
            self.start.to_ip(),
            self.end.to_ip(),
            self.label
        )
    }
}

/// Result of an IDC lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datacenter {
    /// Address is covered by a segment with this label
    Known(Label),
    /// Address is not covered, or was not a valid address
    Unknown,
}

impl Datacenter {
    /// Label, or [`UNKNOWN_IDC`] for misses
    pub fn as_str(&self) -> &str {
        match self {
            Datacenter::Known(label) => label,
            Datacenter::Unknown => UNKNOWN_IDC,
        }
    }

    /// Whether the lookup hit a segment
    pub fn is_known(&self) -> bool {
        matches!(self, Datacenter::Known(_))
    }
}

impl fmt::Display for Datacenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<&str> for Datacenter {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
