//! Flattening and merging of segment lists
//!
//! Segment files follow longest-prefix-match: `10.8.0.0/16` and
//! `10.8.0.0/22` may both be configured, the narrower one winning where
//! they overlap. [`flatten`] splits such nested ranges into a sorted,
//! pairwise-disjoint list; [`merge`] then coalesces neighbours that carry
//! the same label.
//!
//! Inputs are expected to be laminar (any two ranges are either nested or
//! disjoint), which CIDR blocks always are.

use super::Segment;
use crate::family::SegmentAddr;

/// Split possibly nested segments into a sorted, disjoint partition
///
/// Segments are ordered by `start`, wider first on equal starts, so a wide
/// block is always seen before the blocks nested inside it. Where two
/// segments overlap the later one wins; the wide segment is cut around it
/// and its remainder is re-queued right after it. The sort is stable, so
/// among identical ranges the one declared last wins.
pub fn flatten<A: SegmentAddr>(mut segments: Vec<Segment<A>>) -> Vec<Segment<A>> {
    if segments.len() <= 1 {
        return segments;
    }

    segments.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)));

    let mut pending = segments.into_iter();
    let mut flat: Vec<Segment<A>> = Vec::with_capacity(pending.len() * 2);
    flat.extend(pending.next());

    let mut former_idx = 0;
    let mut latter = pending.next();

    while let Some(next) = latter.take() {
        let former = &flat[former_idx];

        if former.end < next.start {
            // independent ranges; move on to the next output slot
            former_idx += 1;
            if former_idx == flat.len() {
                flat.push(next);
                latter = pending.next();
            } else {
                latter = Some(next);
            }
            continue;
        }

        let remainder = match next.end.successor() {
            Some(start) if former.end > next.end => Some(Segment {
                start,
                end: former.end,
                label: former.label.clone(),
            }),
            _ => None,
        };

        let mut insert_at = former_idx + 1;
        if former.start == next.start {
            flat[former_idx] = next;
        } else {
            // former.start < next.start, so next.start has a predecessor
            let cut = next.start.predecessor().unwrap_or(former.start);
            flat[former_idx].end = cut;
            flat.insert(insert_at, next);
            insert_at += 1;
        }

        if let Some(remainder) = remainder {
            flat.insert(insert_at, remainder);
        }

        latter = pending.next();
    }

    flat
}

/// Coalesce contiguous neighbours that share a label
///
/// Input must be sorted and disjoint (the output of [`flatten`]).
pub fn merge<A: SegmentAddr>(flat: Vec<Segment<A>>) -> Vec<Segment<A>> {
    let mut merged: Vec<Segment<A>> = Vec::with_capacity(flat.len());

    for segment in flat {
        if let Some(current) = merged.last_mut()
            && current.label == segment.label
            && current.end.successor() == Some(segment.start)
        {
            current.end = segment.end;
            continue;
        }
        merged.push(segment);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::load_segments;

    fn seg(start: u32, end: u32, label: &str) -> Segment<u32> {
        Segment::new(start, end, label)
    }

    fn spans(segments: &[Segment<u32>]) -> Vec<(u32, u32, &str)> {
        segments
            .iter()
            .map(|s| (s.start, s.end, &*s.label))
            .collect()
    }

    #[test]
    fn test_flatten_empty_and_single() {
        assert!(flatten::<u32>(Vec::new()).is_empty());
        assert_eq!(flatten(vec![seg(5, 9, "a")]), vec![seg(5, 9, "a")]);
    }

    #[test]
    fn test_flatten_disjoint_input_is_sorted() {
        let flat = flatten(vec![seg(200, 299, "b"), seg(0, 99, "a")]);
        assert_eq!(spans(&flat), vec![(0, 99, "a"), (200, 299, "b")]);
    }

    #[test]
    fn test_flatten_same_start_narrower_wins() {
        let flat = flatten(vec![seg(0, 255, "wide"), seg(0, 15, "narrow")]);
        assert_eq!(spans(&flat), vec![(0, 15, "narrow"), (16, 255, "wide")]);
    }

    #[test]
    fn test_flatten_nested_in_middle() {
        let flat = flatten(vec![seg(0, 100, "a"), seg(10, 20, "b")]);
        assert_eq!(
            spans(&flat),
            vec![(0, 9, "a"), (10, 20, "b"), (21, 100, "a")]
        );
    }

    #[test]
    fn test_flatten_nested_at_end() {
        let flat = flatten(vec![seg(0, 127, "a"), seg(64, 127, "b")]);
        assert_eq!(spans(&flat), vec![(0, 63, "a"), (64, 127, "b")]);
    }

    #[test]
    fn test_flatten_three_levels_stays_sorted() {
        let flat = flatten(vec![
            seg(0, 100, "a"),
            seg(10, 20, "b"),
            seg(12, 14, "c"),
            seg(50, 60, "d"),
        ]);
        assert_eq!(
            spans(&flat),
            vec![
                (0, 9, "a"),
                (10, 11, "b"),
                (12, 14, "c"),
                (15, 20, "b"),
                (21, 49, "a"),
                (50, 60, "d"),
                (61, 100, "a"),
            ]
        );
    }

    #[test]
    fn test_flatten_several_blocks_share_a_start() {
        let flat = flatten(vec![seg(0, 10, "c"), seg(0, 100, "a"), seg(0, 20, "b")]);
        assert_eq!(
            spans(&flat),
            vec![(0, 10, "c"), (11, 20, "b"), (21, 100, "a")]
        );
    }

    #[test]
    fn test_flatten_identical_ranges_last_declared_wins() {
        let flat = flatten(vec![seg(0, 99, "first"), seg(0, 99, "second")]);
        assert_eq!(spans(&flat), vec![(0, 99, "second")]);
    }

    #[test]
    fn test_flatten_at_address_space_edges() {
        let flat = flatten(vec![seg(0, u32::MAX, "all"), seg(u32::MAX - 3, u32::MAX, "top")]);
        assert_eq!(
            spans(&flat),
            vec![(0, u32::MAX - 4, "all"), (u32::MAX - 3, u32::MAX, "top")]
        );

        let flat = flatten(vec![seg(0, u32::MAX, "all"), seg(0, 0, "zero")]);
        assert_eq!(spans(&flat), vec![(0, 0, "zero"), (1, u32::MAX, "all")]);
    }

    #[test]
    fn test_merge_same_label_contiguous() {
        let merged = merge(vec![seg(0, 99, "a"), seg(100, 199, "a")]);
        assert_eq!(spans(&merged), vec![(0, 199, "a")]);
    }

    #[test]
    fn test_merge_keeps_different_labels_and_gaps() {
        let merged = merge(vec![seg(0, 99, "a"), seg(100, 199, "b")]);
        assert_eq!(spans(&merged), vec![(0, 99, "a"), (100, 199, "b")]);

        let merged = merge(vec![seg(0, 99, "a"), seg(101, 199, "a")]);
        assert_eq!(spans(&merged), vec![(0, 99, "a"), (101, 199, "a")]);
    }

    #[test]
    fn test_merge_rejoins_split_wide_block() {
        // narrow block with the same label as its parent disappears again
        let merged = merge(flatten(vec![seg(0, 100, "a"), seg(10, 20, "a")]));
        assert_eq!(spans(&merged), vec![(0, 100, "a")]);
    }

    #[test]
    fn test_flatten_merge_idempotent() {
        let lines = [
            "10.0.0.0/8 x",
            "10.1.0.0/16 y",
            "10.1.128.0/17 z",
            "10.2.0.0/16 x",
            "192.168.0.0/24 w",
            "192.168.1.0/24 w",
        ];
        let once = merge(flatten(load_segments::<u32, _, _>(lines)));
        let twice = merge(flatten(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_flatten_v6_word_boundary() {
        let wide = Segment::new(0u128, (1u128 << 64) - 1, "wide");
        let narrow = Segment::new(1u128 << 32, (2u128 << 32) - 1, "narrow");
        let flat = flatten(vec![wide, narrow]);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].end, (1u128 << 32) - 1);
        assert_eq!(flat[2].start, 2u128 << 32);
        assert_eq!(&*flat[2].label, "wide");
    }
}
