//! Interval algebra over the audio/transcript timeline.
//!
//! Removal segments reported by the classifier are unordered and may
//! overlap; the complement computed here is what the audio editor and
//! transcript reconciler actually operate on.

/// A span of the timeline in seconds, with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInterval {
    pub start: f64,
    pub end: f64,
}

impl TimeInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the interval in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True if the two intervals share any time, touching endpoints excluded
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }
}

/// Compute the intervals to keep, given the intervals to remove.
///
/// Removals may be unsorted, overlapping, or nested; the cursor never
/// retreats, which makes their union the effective coverage. The result is
/// sorted ascending and pairwise disjoint. An empty removal list yields a
/// single interval spanning the whole duration; full coverage yields an
/// empty list, which callers must treat as "no content remains" rather
/// than splice nothing.
pub fn keep_intervals(removals: &[TimeInterval], total_duration: f64) -> Vec<TimeInterval> {
    let mut removals = removals.to_vec();
    removals.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut keep = Vec::new();
    let mut cursor = 0.0;

    for removal in &removals {
        if removal.start > cursor {
            keep.push(TimeInterval::new(cursor, removal.start));
        }
        cursor = cursor.max(removal.end);
    }

    if cursor < total_duration {
        keep.push(TimeInterval::new(cursor, total_duration));
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals(pairs: &[(f64, f64)]) -> Vec<TimeInterval> {
        pairs.iter().map(|&(s, e)| TimeInterval::new(s, e)).collect()
    }

    fn assert_keep(removals: &[(f64, f64)], total: f64, expected: &[(f64, f64)]) {
        let result = keep_intervals(&intervals(removals), total);
        assert_eq!(result, intervals(expected));
    }

    #[test]
    fn no_removals_keeps_whole_duration() {
        assert_keep(&[], 60.0, &[(0.0, 60.0)]);
    }

    #[test]
    fn full_coverage_keeps_nothing() {
        assert_keep(&[(0.0, 30.0)], 30.0, &[]);
    }

    #[test]
    fn overlapping_removals_merge() {
        // merged coverage is [10,25] ∪ [80,100]
        assert_keep(
            &[(10.0, 20.0), (15.0, 25.0), (80.0, 100.0)],
            100.0,
            &[(0.0, 10.0), (25.0, 80.0)],
        );
    }

    #[test]
    fn unsorted_removals_are_sorted_first() {
        assert_keep(
            &[(80.0, 100.0), (10.0, 20.0), (15.0, 25.0)],
            100.0,
            &[(0.0, 10.0), (25.0, 80.0)],
        );
    }

    #[test]
    fn nested_removal_never_retreats_cursor() {
        assert_keep(&[(10.0, 50.0), (20.0, 30.0)], 60.0, &[(0.0, 10.0), (50.0, 60.0)]);
    }

    #[test]
    fn removal_at_start_and_end() {
        assert_keep(&[(0.0, 5.0), (55.0, 60.0)], 60.0, &[(5.0, 55.0)]);
    }

    #[test]
    fn removal_past_end_is_clamped_by_cursor() {
        assert_keep(&[(50.0, 120.0)], 100.0, &[(0.0, 50.0)]);
    }

    #[test]
    fn keep_intervals_are_disjoint_and_sorted() {
        let removals = intervals(&[(40.0, 45.0), (5.0, 12.0), (30.0, 44.0), (12.0, 13.0)]);
        let keep = keep_intervals(&removals, 90.0);

        for pair in keep.windows(2) {
            assert!(pair[0].end <= pair[1].start);
            assert!(pair[0].start < pair[1].start);
        }
    }

    #[test]
    fn keep_plus_removals_cover_duration_exactly() {
        let removals = intervals(&[(40.0, 45.0), (5.0, 12.0), (30.0, 44.0), (12.0, 13.0)]);
        let total = 90.0;
        let keep = keep_intervals(&removals, total);

        let kept: f64 = keep.iter().map(|iv| iv.duration()).sum();
        // merged removal coverage: [5,13] ∪ [30,45] = 23s
        assert!((kept - (total - 23.0)).abs() < 1e-9);
    }

    #[test]
    fn overlap_test_excludes_touching_endpoints() {
        let a = TimeInterval::new(0.0, 10.0);
        let b = TimeInterval::new(10.0, 20.0);
        let c = TimeInterval::new(5.0, 15.0);

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }
}
