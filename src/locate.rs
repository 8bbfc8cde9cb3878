//! Mapping a playback position onto the committed segment list.
//!
//! The contract is a pure function: given segments sorted by `start_time` and a clock
//! position, return the index of the first segment whose `[start, end)` contains it.
//!
//! Overlapping segments are tolerated: the first match in list order wins.

use crate::segments::Segment;

/// Index of the first segment in list order whose `[start_time, end_time)` contains `t`.
///
/// Returns `None` for an empty list, for gaps between segments, and for positions before
/// the first or after the last segment.
pub fn locate_active(segments: &[Segment], t: f64) -> Option<usize> {
    segments.iter().position(|seg| seg.contains(t))
}

/// Strategy used by [`crate::playback::PlaybackSession`] to find the active segment.
///
/// The default linear scan is fine for a few hundred segments at clock-tick rates.
/// Hosts with much longer transcripts can swap in [`BisectLocator`].
pub trait ActiveLocator {
    fn locate(&self, segments: &[Segment], t: f64) -> Option<usize>;
}

/// First-match linear scan. Honors the overlap tie-break for any input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearLocator;

impl ActiveLocator for LinearLocator {
    fn locate(&self, segments: &[Segment], t: f64) -> Option<usize> {
        locate_active(segments, t)
    }
}

/// Binary search over start times.
///
/// Requires the list to be sorted by `start_time` and non-overlapping; under that
/// precondition it agrees with [`locate_active`]. With overlaps it may pick a later
/// segment than the linear scan would.
#[derive(Debug, Clone, Copy, Default)]
pub struct BisectLocator;

impl ActiveLocator for BisectLocator {
    fn locate(&self, segments: &[Segment], t: f64) -> Option<usize> {
        // Number of segments starting at or before `t`; the candidate is the last of them.
        let starts_before = segments.partition_point(|seg| seg.start_time <= t);
        let idx = starts_before.checked_sub(1)?;
        segments[idx].contains(t).then_some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::DraftSegment;

    fn segs(ranges: &[(f64, f64)]) -> Vec<Segment> {
        ranges
            .iter()
            .enumerate()
            .map(|(i, &(s, e))| DraftSegment::new(format!("s{i}"), s, e).to_segment(i))
            .collect()
    }

    #[test]
    fn boundary_belongs_to_the_later_segment() {
        let list = segs(&[(0.0, 2.0), (2.0, 5.0)]);
        assert_eq!(locate_active(&list, 2.0), Some(1));
        assert_eq!(locate_active(&list, 1.999), Some(0));
        assert_eq!(locate_active(&list, 6.0), None);
    }

    #[test]
    fn gaps_and_edges_yield_none() {
        let list = segs(&[(1.0, 2.0), (3.0, 4.0)]);
        assert_eq!(locate_active(&list, 0.0), None);
        assert_eq!(locate_active(&list, 2.5), None);
        assert_eq!(locate_active(&list, 4.0), None);
        assert_eq!(locate_active(&[], 1.0), None);
    }

    #[test]
    fn overlapping_segments_resolve_to_first_in_list_order() {
        let list = segs(&[(0.0, 3.0), (1.0, 4.0)]);
        assert_eq!(locate_active(&list, 2.0), Some(0));
        assert_eq!(locate_active(&list, 3.5), Some(1));
    }

    #[test]
    fn bisect_agrees_with_linear_scan_on_sorted_disjoint_lists() {
        let list = segs(&[(0.0, 1.5), (1.5, 2.0), (2.5, 4.0), (4.0, 4.25), (7.0, 9.0)]);
        let mut t = 0.0;
        while t < 10.0 {
            assert_eq!(
                BisectLocator.locate(&list, t),
                LinearLocator.locate(&list, t),
                "disagreement at t={t}"
            );
            t += 0.125;
        }
        assert_eq!(BisectLocator.locate(&[], 0.0), None);
    }
}
