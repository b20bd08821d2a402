//! The parallel time-series coordinator.
//!
//! [`build_time_series`] validates its inputs, partitions the range, fans one
//! blocking worker out per non-empty partition, and drains a single bounded
//! multi-producer channel until every worker's sender has dropped. Each
//! worker is joined through its task handle afterwards, so completion is an
//! explicit signal rather than a liveness poll, and no row can slip between a
//! drain and a worker's exit.
//!
//! Row arrival order across partitions is unspecified; the terminal stable
//! sort by window start is the only output-ordering guarantee.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::model::{Cohort, ResultRow, TimeBound, TimeSeries};
use crate::options::EngineOptions;
use crate::partition::partition;
use crate::strategy::{Aggregator, MetricStrategy};
use crate::window::WindowSequence;
use crate::worker::run_partition;

/// Capacity of the row channel shared by all workers. Workers block on a
/// full channel until the coordinator drains it.
const ROW_CHANNEL_CAPACITY: usize = 64;

/// Build a time series of aggregated metric values over `[start, end)`.
///
/// The range is divided into `interval_hours`-wide windows, the windows are
/// partitioned across `options.concurrency` workers, and each worker invokes
/// `strategy` + `aggregator` once per window. The returned series is sorted
/// ascending by window start and carries metadata about skipped windows and
/// lost partitions; identical inputs with a deterministic strategy produce an
/// identical series regardless of concurrency.
///
/// # Arguments
///
/// * `start`, `end` - range bounds, structured or textual (see [`TimeBound`])
/// * `interval_hours` - window width in hours
/// * `strategy` - per-window metric computation
/// * `aggregator` - reducer from per-entity results to one summary row
/// * `cohort` - entity set shared read-only by every worker
/// * `options` - concurrency, logging, and error-policy settings
///
/// # Errors
///
/// Fails before spawning any worker with [`EngineError::InsufficientRange`],
/// [`EngineError::InvalidConcurrency`], or [`EngineError::InvalidTimestamp`].
/// Under the fail-fast policy a per-window failure surfaces as
/// [`EngineError::WindowComputation`] once all workers have drained.
pub async fn build_time_series(
    start: impl Into<TimeBound>,
    end: impl Into<TimeBound>,
    interval_hours: u32,
    strategy: Arc<dyn MetricStrategy>,
    aggregator: Arc<dyn Aggregator>,
    cohort: Cohort,
    options: EngineOptions,
) -> Result<TimeSeries, EngineError> {
    let start = start.into().resolve()?;
    let end = end.into().resolve()?;

    if options.concurrency == 0 {
        return Err(EngineError::InvalidConcurrency(0));
    }
    // Validates the range before any work is spawned; each partition
    // re-derives its own window sub-sequence from the same boundaries.
    WindowSequence::new(start, end, interval_hours)?;

    let partitions = partition(start, end, interval_hours, options.concurrency)?;

    let (tx, mut rx) = mpsc::channel::<ResultRow>(ROW_CHANNEL_CAPACITY);
    let mut handles = Vec::new();

    if options.log {
        info!(
            %start,
            %end,
            interval_hours,
            workers = partitions.iter().filter(|p| !p.is_empty()).count(),
            "spawning workers"
        );
    }

    for part in partitions {
        // A zero-interval partition has nothing to do; don't spawn for it.
        if part.is_empty() {
            continue;
        }
        let tx = tx.clone();
        let strategy = Arc::clone(&strategy);
        let aggregator = Arc::clone(&aggregator);
        let cohort = cohort.clone();
        let options = options.clone();
        let index = part.index;
        let handle = tokio::task::spawn_blocking(move || {
            run_partition(part, interval_hours, strategy, aggregator, cohort, options, tx)
        });
        handles.push((index, handle));
    }
    // The coordinator's own sender must drop so the drain loop can end once
    // every worker has finished.
    drop(tx);

    let mut rows = Vec::new();
    while let Some(row) = rx.recv().await {
        rows.push(row);
    }

    let mut skipped = Vec::new();
    let mut lost_partitions = Vec::new();
    let mut failure: Option<EngineError> = None;

    for (index, handle) in handles {
        match handle.await {
            Ok(report) => {
                debug!(
                    partition = report.partition_index,
                    rows = report.rows_emitted,
                    "worker finished"
                );
                skipped.extend(report.skipped);
                if let Some((window_start, source)) = report.failure {
                    if failure.is_none() {
                        failure = Some(EngineError::WindowComputation {
                            window_start,
                            source,
                        });
                    }
                }
            }
            Err(err) => {
                warn!(
                    partition = index,
                    error = %err,
                    "worker terminated without completing its partition"
                );
                lost_partitions.push(index);
            }
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }

    rows.sort_by_key(|row| row.window.start);
    skipped.sort_by_key(|s| s.window.start);

    if options.log {
        info!(
            rows = rows.len(),
            skipped = skipped.len(),
            lost_partitions = lost_partitions.len(),
            "time series assembled"
        );
    }

    Ok(TimeSeries {
        rows,
        skipped,
        lost_partitions,
    })
}
