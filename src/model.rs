//! Data models for Tidemark.
//!
//! The engine operates on a small set of value types:
//!
//! - [`TimeWindow`]: a contiguous `[start, end)` sub-range over which one
//!   metric value is computed
//! - [`Cohort`]: the read-only set of entity identifiers a metric is
//!   evaluated over, shared cheaply across workers
//! - [`ResultRow`]: one window's aggregated numeric fields
//! - [`TimeSeries`]: the final ordered series, plus metadata about windows
//!   that were skipped and partitions that were lost
//! - [`TimeBound`]: a timestamp input accepted either as a structured
//!   `DateTime<Utc>` or as text in a handful of fixed formats

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::EngineError;

/// Compact timestamp format accepted on all text interfaces, e.g.
/// `"20120101000000"` for 2012-01-01T00:00:00Z.
pub const COMPACT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Identifier of a single entity (e.g. a user ID) within a cohort.
pub type EntityId = u64;

/// A contiguous, non-overlapping time sub-range.
///
/// Invariant: `start < end`. Windows produced by one
/// [`WindowSequence`](crate::window::WindowSequence) are contiguous:
/// each window's `end` is the next window's `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    /// Inclusive start of the window (UTC).
    pub start: DateTime<Utc>,

    /// Exclusive end of the window (UTC).
    pub end: DateTime<Utc>,
}

/// One aggregated data point of the output series.
///
/// Produced once per window by a worker. The natural sort key is
/// `window.start`; field order follows the strategy's
/// [`FieldSchema`](crate::strategy::FieldSchema).
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
    /// The window this row summarizes.
    pub window: TimeWindow,

    /// Ordered numeric summary fields for the window.
    pub fields: Vec<f64>,
}

/// A window that was dropped from the series because its computation failed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedWindow {
    /// The window that was skipped.
    pub window: TimeWindow,

    /// Human-readable failure description.
    pub reason: String,
}

/// The assembled time series returned by the engine.
///
/// Rows are sorted ascending by window start. The envelope also reports
/// everything that went wrong without aborting the build: windows skipped
/// under the fail-soft policy and partitions whose worker terminated before
/// completing (those rows are simply absent).
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    /// Data points in ascending window-start order.
    pub rows: Vec<ResultRow>,

    /// Windows dropped because their metric computation failed.
    pub skipped: Vec<SkippedWindow>,

    /// Indices of partitions whose worker died before finishing.
    pub lost_partitions: Vec<usize>,
}

impl TimeSeries {
    /// Number of data points in the series.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the series contains no data points.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every window of the requested range made it into the series.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.lost_partitions.is_empty()
    }
}

/// A read-only set of entity identifiers, shared by reference across workers.
///
/// Cloning a `Cohort` is cheap (it clones an `Arc`); the underlying set is
/// never mutated after construction, which is what makes sharing it across
/// concurrent workers safe.
#[derive(Debug, Clone)]
pub struct Cohort(Arc<BTreeSet<EntityId>>);

impl Cohort {
    /// Build a cohort from any collection of entity ids. Duplicates collapse.
    pub fn new(ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self(Arc::new(ids.into_iter().collect()))
    }

    /// Number of distinct entities in the cohort.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cohort contains no entities.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the cohort contains the given entity.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.0.contains(&entity)
    }

    /// Iterate the entity ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<EntityId> for Cohort {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<EntityId>> for Cohort {
    fn from(ids: Vec<EntityId>) -> Self {
        Self::new(ids)
    }
}

/// A timestamp input: either an already-structured instant or text to parse.
///
/// Text is accepted in the compact `%Y%m%d%H%M%S` form, RFC 3339, a space- or
/// `T`-separated `YYYY-MM-DD HH:MM:SS`, or a bare `YYYY-MM-DD` date (taken as
/// midnight UTC). All internal comparisons operate on the resolved
/// `DateTime<Utc>`.
#[derive(Debug, Clone)]
pub enum TimeBound {
    /// A structured instant, used as-is.
    Instant(DateTime<Utc>),

    /// Text to be parsed on resolution.
    Text(String),
}

impl TimeBound {
    /// Resolve to a structured UTC instant.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTimestamp`] if a textual bound matches
    /// none of the accepted formats.
    pub fn resolve(&self) -> Result<DateTime<Utc>, EngineError> {
        match self {
            TimeBound::Instant(ts) => Ok(*ts),
            TimeBound::Text(text) => {
                parse_timestamp(text).ok_or_else(|| EngineError::InvalidTimestamp(text.clone()))
            }
        }
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(ts: DateTime<Utc>) -> Self {
        TimeBound::Instant(ts)
    }
}

impl From<&str> for TimeBound {
    fn from(text: &str) -> Self {
        TimeBound::Text(text.to_string())
    }
}

impl From<String> for TimeBound {
    fn from(text: String) -> Self {
        TimeBound::Text(text)
    }
}

/// Try each accepted textual format in turn.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, COMPACT_TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_format() {
        let ts = TimeBound::from("20120101000000").resolve().unwrap();
        assert_eq!(ts.to_rfc3339(), "2012-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_rfc3339() {
        let ts = TimeBound::from("2012-01-01T06:30:00Z").resolve().unwrap();
        assert_eq!(ts.to_rfc3339(), "2012-01-01T06:30:00+00:00");
    }

    #[test]
    fn test_parse_date_only() {
        let ts = TimeBound::from("2012-01-01").resolve().unwrap();
        assert_eq!(ts.to_rfc3339(), "2012-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_space_separated() {
        let ts = TimeBound::from("2012-01-01 12:00:00").resolve().unwrap();
        assert_eq!(ts.to_rfc3339(), "2012-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_invalid_timestamp() {
        let err = TimeBound::from("next tuesday").resolve().unwrap_err();
        assert!(matches!(err, EngineError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_instant_passes_through() {
        let now = Utc::now();
        let ts = TimeBound::from(now).resolve().unwrap();
        assert_eq!(ts, now);
    }

    #[test]
    fn test_cohort_deduplicates() {
        let cohort = Cohort::new([3, 1, 2, 1, 3]);
        assert_eq!(cohort.len(), 3);
        assert!(cohort.contains(2));
        assert!(!cohort.contains(4));
        let ids: Vec<EntityId> = cohort.iter().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_series_completeness() {
        let series = TimeSeries {
            rows: vec![],
            skipped: vec![],
            lost_partitions: vec![],
        };
        assert!(series.is_empty());
        assert!(series.is_complete());

        let partial = TimeSeries {
            rows: vec![],
            skipped: vec![],
            lost_partitions: vec![2],
        };
        assert!(!partial.is_complete());
    }
}
