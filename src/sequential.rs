//! Single-process sequential variant of the engine.
//!
//! Where the parallel coordinator fixes its cohort up front,
//! [`sequential_series`] is for metrics whose cohort is time-varying (e.g.
//! "users newly registered within the full outer range"): the applicable
//! cohort is resolved afresh for every window, and each window's result is
//! yielded immediately in the calling context. No partitioning, no channel,
//! no worker tasks; the window-boundary and validation contracts are shared
//! with the parallel engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::model::{Cohort, ResultRow, SkippedWindow, TimeBound, TimeSeries};
use crate::options::{EngineOptions, ErrorPolicy};
use crate::strategy::{Aggregator, FieldSchema, MetricStrategy};
use crate::window::WindowSequence;

/// Resolves the cohort applicable to a window.
///
/// Called once per window with the *full outer range* of the series, not the
/// window's own bounds; implementations are free to cache the result across
/// calls since the arguments never change within one series.
pub trait CohortResolver: Send + Sync {
    /// Produce the cohort for a series spanning `[range_start, range_end)`.
    fn resolve(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> anyhow::Result<Cohort>;
}

/// A fixed cohort that ignores the range.
impl CohortResolver for Cohort {
    fn resolve(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> anyhow::Result<Cohort> {
        Ok(self.clone())
    }
}

/// Lazy iterator over a sequentially computed time series.
///
/// Yields one `Result<ResultRow, EngineError>` per window, in ascending time
/// order. Under the fail-soft policy failing windows are skipped (and
/// recorded, see [`SequentialSeries::collect_series`]); under fail-fast the
/// first failure is yielded as an error and the iterator fuses.
pub struct SequentialSeries {
    windows: WindowSequence,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    strategy: Arc<dyn MetricStrategy>,
    aggregator: Arc<dyn Aggregator>,
    resolver: Arc<dyn CohortResolver>,
    options: EngineOptions,
    schema: FieldSchema,
    skipped: Vec<SkippedWindow>,
    done: bool,
}

/// Build a sequential, lazily evaluated time series over `[start, end)`.
///
/// # Errors
///
/// Fails immediately with [`EngineError::InsufficientRange`] or
/// [`EngineError::InvalidTimestamp`] before computing anything.
pub fn sequential_series(
    start: impl Into<TimeBound>,
    end: impl Into<TimeBound>,
    interval_hours: u32,
    strategy: Arc<dyn MetricStrategy>,
    aggregator: Arc<dyn Aggregator>,
    resolver: Arc<dyn CohortResolver>,
    options: EngineOptions,
) -> Result<SequentialSeries, EngineError> {
    let range_start = start.into().resolve()?;
    let range_end = end.into().resolve()?;
    let windows = WindowSequence::new(range_start, range_end, interval_hours)?;
    let schema = strategy.field_schema();

    Ok(SequentialSeries {
        windows,
        range_start,
        range_end,
        strategy,
        aggregator,
        resolver,
        options,
        schema,
        skipped: Vec::new(),
        done: false,
    })
}

impl SequentialSeries {
    /// Drain the iterator into a [`TimeSeries`] envelope, carrying any
    /// fail-soft skips as metadata.
    pub fn collect_series(mut self) -> Result<TimeSeries, EngineError> {
        let mut rows = Vec::new();
        for item in self.by_ref() {
            rows.push(item?);
        }
        Ok(TimeSeries {
            rows,
            skipped: self.skipped,
            lost_partitions: Vec::new(),
        })
    }
}

impl Iterator for SequentialSeries {
    type Item = Result<ResultRow, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let window = self.windows.next()?;
            if self.options.log {
                info!(
                    window_start = %window.start,
                    window_end = %window.end,
                    "processing window"
                );
            }

            let outcome = self
                .resolver
                .resolve(self.range_start, self.range_end)
                .and_then(|cohort| {
                    let results =
                        self.strategy
                            .compute(window, &cohort, &self.options.strategy)?;
                    let summary = self.aggregator.reduce(&results, &self.schema)?;
                    Ok(ResultRow {
                        window,
                        fields: summary.fields,
                    })
                });

            match outcome {
                Ok(row) => return Some(Ok(row)),
                Err(err) => match self.options.error_policy {
                    ErrorPolicy::FailSoft => {
                        warn!(
                            window_start = %window.start,
                            error = %err,
                            "window computation failed, skipping window"
                        );
                        self.skipped.push(SkippedWindow {
                            window,
                            reason: err.to_string(),
                        });
                    }
                    ErrorPolicy::FailFast => {
                        self.done = true;
                        return Some(Err(EngineError::WindowComputation {
                            window_start: window.start,
                            source: err,
                        }));
                    }
                },
            }
        }
    }
}
