//! Immutable lookup table
//!
//! A [`SegmentTable`] is built once per refresh and never mutated
//! afterwards; readers share it behind an `Arc`.

use super::{Datacenter, Segment, flatten, load_segments, merge};
use crate::family::SegmentAddr;

/// Sorted, pairwise-disjoint segments queried by binary search
///
/// Invariant: `segments[i].end < segments[i + 1].start` for all `i`.
/// Addresses between segments resolve to [`Datacenter::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTable<A> {
    segments: Vec<Segment<A>>,
}

impl<A: SegmentAddr> SegmentTable<A> {
    /// Table that resolves every address to unknown
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Build a table from possibly overlapping segments
    pub fn from_segments(segments: Vec<Segment<A>>) -> Self {
        Self {
            segments: merge(flatten(segments)),
        }
    }

    /// Build a table from `"<CIDR> <label>"` lines
    ///
    /// Malformed lines are skipped, repeated CIDR text keeps the first line.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_segments(load_segments::<A, _, _>(lines))
    }

    /// Resolve an address
    ///
    /// Finds the first segment whose `end >= addr`; the address is a hit
    /// only if that segment also starts at or before it.
    pub fn lookup(&self, addr: A) -> Datacenter {
        let idx = self.segments.partition_point(|segment| segment.end < addr);
        match self.segments.get(idx) {
            Some(segment) if segment.start <= addr => Datacenter::Known(segment.label.clone()),
            _ => Datacenter::Unknown,
        }
    }

    /// Number of disjoint segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the table has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &Segment<A>> {
        self.segments.iter()
    }

    /// Segments as a slice
    pub fn segments(&self) -> &[Segment<A>] {
        &self.segments
    }

    /// Check the ordering invariant
    pub fn is_well_formed(&self) -> bool {
        self.segments.iter().all(|s| s.start <= s.end)
            && self.segments.windows(2).all(|w| w[0].end < w[1].start)
    }
}

impl<A: SegmentAddr> Default for SegmentTable<A> {
    fn default() -> Self {
        Self::empty()
    }
}
