//! Segment loader
//!
//! Turns `"<CIDR> <label>"` lines into records. Every failure mode is
//! "skip this line": nothing here returns an error.

use std::collections::HashSet;

use tracing::debug;

use super::Segment;
use crate::family::SegmentAddr;

/// One accepted input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// CIDR text exactly as written
    pub cidr: String,
    /// IDC label
    pub label: String,
}

impl RawRecord {
    /// Resolve the CIDR into a segment of family `A`
    pub fn to_segment<A: SegmentAddr>(&self) -> Option<Segment<A>> {
        let (start, end) = A::parse_cidr(&self.cidr)?;
        Some(Segment::new(start, end, self.label.as_str()))
    }
}

/// Parse lines into records valid for family `A`
///
/// - lines that do not split into exactly two whitespace tokens are skipped
/// - CIDRs that do not parse for `A` are skipped
/// - repeated CIDR text keeps the first occurrence only
pub fn parse_records<A, I, S>(lines: I) -> Vec<RawRecord>
where
    A: SegmentAddr,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        let line = line.as_ref();
        let mut tokens = line.split_whitespace();
        let (Some(cidr), Some(label), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            if !line.trim().is_empty() {
                skipped += 1;
            }
            continue;
        };

        // agent lines precede local lines, so the agent file wins
        if seen.contains(cidr) {
            skipped += 1;
            continue;
        }

        if A::parse_cidr(cidr).is_none() {
            skipped += 1;
            continue;
        }

        seen.insert(cidr.to_string());
        records.push(RawRecord {
            cidr: cidr.to_string(),
            label: label.to_string(),
        });
    }

    if skipped > 0 {
        debug!(
            "Skipped {} {} segment line(s), kept {}",
            skipped,
            A::FAMILY,
            records.len()
        );
    }

    records
}

/// Parse lines straight into segments of family `A`
pub fn load_segments<A, I, S>(lines: I) -> Vec<Segment<A>>
where
    A: SegmentAddr,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_records::<A, _, _>(lines)
        .iter()
        .filter_map(|record| record.to_segment::<A>())
        .collect()
}
