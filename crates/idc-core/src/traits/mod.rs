//! Core traits for the IDC resolver
//!
//! - [`SegmentSource`]: Produce raw `"<CIDR> <label>"` lines per address family

pub mod segment_source;

pub use segment_source::SegmentSource;
