//! Range partitioning across workers.
//!
//! [`partition`] splits `[start, end)` into `k` contiguous sub-ranges of
//! equal interval count (floor division), plus at most one trailing
//! remainder partition, preserving global time order. Concatenating every
//! partition's windows in partition-index order reproduces the single-worker
//! window sequence exactly, with no gaps or overlaps.

use chrono::{DateTime, Duration, Utc};

use crate::error::EngineError;
use crate::window::WindowSequence;

/// A contiguous run of windows assigned to one worker.
///
/// Owned exclusively by the coordinator until handed to a worker; after
/// handoff the worker owns it for its lifetime.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Zero-based position of this partition in the full range.
    pub index: usize,

    /// Inclusive start of the partition's sub-range.
    pub start: DateTime<Utc>,

    /// Exclusive end of the partition's sub-range.
    pub end: DateTime<Utc>,
}

impl Partition {
    /// Whether the partition covers no intervals at all.
    ///
    /// Legitimate when the total interval count is smaller than the worker
    /// count; such a partition simply produces no windows.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The windows covered by this partition, in ascending time order.
    pub fn windows(&self, interval_hours: u32) -> WindowSequence {
        WindowSequence::spanning(self.start, self.end, interval_hours)
    }
}

/// Split `[start, end)` into `k` partitions plus an optional remainder.
///
/// Worker `i` receives `floor(total_intervals / k)` whole intervals starting
/// at `start + i * intervals_per_worker * interval`. Whatever the floor
/// division leaves uncovered becomes one extra trailing partition ending at
/// `end`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidConcurrency`] when `k == 0`, and
/// [`EngineError::InsufficientRange`] when `interval_hours` is zero.
pub fn partition(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval_hours: u32,
    k: usize,
) -> Result<Vec<Partition>, EngineError> {
    if k == 0 {
        return Err(EngineError::InvalidConcurrency(k));
    }
    if interval_hours == 0 {
        return Err(EngineError::InsufficientRange {
            start,
            end,
            interval_hours,
        });
    }

    let total_intervals = (end - start).num_hours() / i64::from(interval_hours);
    let intervals_per_worker = total_intervals / k as i64;
    let step = Duration::hours(intervals_per_worker * i64::from(interval_hours));

    let mut partitions: Vec<Partition> = (0..k)
        .map(|i| Partition {
            index: i,
            start: start + step * i as i32,
            end: start + step * (i as i32 + 1),
        })
        .collect();

    // Remainder intervals (and any sub-interval tail) go to one extra worker.
    let covered = start + step * k as i32;
    if covered < end {
        partitions.push(Partition {
            index: k,
            start: covered,
            end,
        });
    }

    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TimeBound, TimeWindow};

    fn ts(text: &str) -> DateTime<Utc> {
        TimeBound::from(text).resolve().unwrap()
    }

    fn all_windows(partitions: &[Partition], interval_hours: u32) -> Vec<TimeWindow> {
        partitions
            .iter()
            .flat_map(|p| p.windows(interval_hours))
            .collect()
    }

    #[test]
    fn test_eleven_days_across_four_workers() {
        let start = ts("2012-01-01");
        let end = ts("2012-01-12");
        let partitions = partition(start, end, 24, 4).unwrap();

        // 11 intervals / 4 workers = 2 each, plus a 3-interval remainder.
        assert_eq!(partitions.len(), 5);
        let counts: Vec<usize> = partitions.iter().map(|p| p.windows(24).count()).collect();
        assert_eq!(counts, vec![2, 2, 2, 2, 3]);

        // Boundaries are contiguous across partitions.
        for pair in partitions.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(partitions[0].start, start);
        assert_eq!(partitions.last().unwrap().end, end);
    }

    #[test]
    fn test_concatenation_matches_single_worker_sequence() {
        let start = ts("2012-01-01");
        let end = ts("2012-01-12");

        let reference: Vec<TimeWindow> =
            WindowSequence::new(start, end, 24).unwrap().collect();

        for k in 1..=8 {
            let partitions = partition(start, end, 24, k).unwrap();
            assert_eq!(all_windows(&partitions, 24), reference, "k = {k}");
        }
    }

    #[test]
    fn test_remainder_shorter_than_one_interval() {
        // 25 hours at 24-hour intervals, one worker: the trailing partition
        // covers a single clamped 1-hour window.
        let start = ts("2012-01-01");
        let end = ts("2012-01-02 01:00:00");
        let partitions = partition(start, end, 24, 1).unwrap();

        assert_eq!(partitions.len(), 2);
        let windows = all_windows(&partitions, 24);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].end, end);
    }

    #[test]
    fn test_more_workers_than_intervals() {
        let start = ts("2012-01-01");
        let end = ts("2012-01-03");
        let partitions = partition(start, end, 24, 5).unwrap();

        // Two intervals across five workers: every numbered partition is
        // empty and the remainder carries the whole range.
        assert_eq!(partitions.iter().filter(|p| p.is_empty()).count(), 5);
        assert_eq!(all_windows(&partitions, 24).len(), 2);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = partition(ts("2012-01-01"), ts("2012-01-12"), 24, 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConcurrency(0)));
    }

    #[test]
    fn test_exact_division_has_no_remainder() {
        let partitions = partition(ts("2012-01-01"), ts("2012-01-09"), 24, 4).unwrap();
        assert_eq!(partitions.len(), 4);
        let counts: Vec<usize> = partitions.iter().map(|p| p.windows(24).count()).collect();
        assert_eq!(counts, vec![2, 2, 2, 2]);
    }
}
