// # Segment Source Implementations
//
// This module provides implementations of the SegmentSource trait for
// different ways of obtaining segment lines.

pub mod file;
pub mod fixed;

pub use file::{FileSegmentSource, read_segment_file};
pub use fixed::StaticSegmentSource;
