//! Window boundary derivation.
//!
//! A [`WindowSequence`] turns a `(start, end, interval_hours)` triple into a
//! lazy, finite iterator of contiguous [`TimeWindow`]s. The sequence signals
//! exhaustion through the iterator protocol itself rather than an error.
//!
//! For a valid range the sequence produces `ceil((end - start) / interval)`
//! windows: consecutive windows share a boundary, and when the range is not
//! an exact multiple of the interval the final window's end is clamped to
//! `end` instead of overshooting.

use chrono::{DateTime, Duration, Utc};

use crate::error::EngineError;
use crate::model::TimeWindow;

/// A lazy, finite, non-restartable sequence of time windows.
#[derive(Debug, Clone)]
pub struct WindowSequence {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
}

impl WindowSequence {
    /// Build a validated window sequence over `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InsufficientRange`] if `interval_hours` is zero
    /// or the range does not contain at least one full interval. Validation
    /// happens here, before any window is produced.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_hours: u32,
    ) -> Result<Self, EngineError> {
        if interval_hours == 0 || end - start < Duration::hours(i64::from(interval_hours)) {
            return Err(EngineError::InsufficientRange {
                start,
                end,
                interval_hours,
            });
        }
        Ok(Self::spanning(start, end, interval_hours))
    }

    /// Build a sequence without range validation.
    ///
    /// Used for partition sub-ranges, which may legitimately be empty or
    /// shorter than one interval (the trailing remainder partition). Yields
    /// nothing when `start >= end`. Callers must guarantee
    /// `interval_hours > 0`.
    pub(crate) fn spanning(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_hours: u32,
    ) -> Self {
        Self {
            cursor: start,
            end,
            step: Duration::hours(i64::from(interval_hours)),
        }
    }
}

impl Iterator for WindowSequence {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.cursor >= self.end {
            return None;
        }
        // Clamp the final window to the range end.
        let next = (self.cursor + self.step).min(self.end);
        let window = TimeWindow {
            start: self.cursor,
            end: next,
        };
        self.cursor = next;
        Some(window)
    }
}
