//! Error types for the aggregation engine.
//!
//! Validation errors (`InsufficientRange`, `InvalidConcurrency`,
//! `InvalidTimestamp`) abort a build before any worker is spawned.
//! `WindowComputation` is only ever surfaced under the fail-fast policy;
//! under the default fail-soft policy a failing window is skipped and
//! recorded in the returned series instead.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by the time-series engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested range is shorter than a single interval (or the
    /// interval itself is zero).
    #[error(
        "time series must contain at least one interval \
         ({start} .. {end} at {interval_hours}h)"
    )]
    InsufficientRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_hours: u32,
    },

    /// The worker count must be at least 1.
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// A textual timestamp did not match any accepted format.
    #[error("unrecognized timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// A single window's strategy or aggregator invocation failed while the
    /// fail-fast policy was in effect.
    #[error("metric computation failed for window starting {window_start}")]
    WindowComputation {
        window_start: DateTime<Utc>,
        #[source]
        source: anyhow::Error,
    },
}
