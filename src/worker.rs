//! Per-partition worker loop.
//!
//! A worker consumes one partition's windows strictly sequentially and in
//! ascending time order, invoking the strategy and aggregator for each, and
//! pushes one [`ResultRow`] per window into the shared bounded channel.
//! Metric strategies may have super-linear cost in cohort size, so windows
//! within a partition are never parallelized at this layer; a strategy's own
//! internal parallelism is its own concern.
//!
//! A full channel exerts backpressure: `blocking_send` parks the worker until
//! the coordinator's next drain, and never drops a row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::model::{Cohort, ResultRow, SkippedWindow, TimeWindow};
use crate::options::{EngineOptions, ErrorPolicy};
use crate::partition::Partition;
use crate::strategy::{Aggregator, FieldSchema, MetricStrategy};

/// What a worker hands back to the coordinator when it finishes.
#[derive(Debug)]
pub(crate) struct WorkerReport {
    /// Index of the partition this worker processed.
    pub partition_index: usize,

    /// Rows successfully pushed to the channel.
    pub rows_emitted: usize,

    /// Windows skipped under the fail-soft policy.
    pub skipped: Vec<SkippedWindow>,

    /// Set when the fail-fast policy stopped the partition early.
    pub failure: Option<(DateTime<Utc>, anyhow::Error)>,
}

/// Run one partition to completion, emitting rows into `tx`.
///
/// Blocking; intended to run inside `tokio::task::spawn_blocking`. Per-window
/// strategy and aggregator failures are handled according to
/// `options.error_policy`; a panic escapes to the task handle, where the
/// coordinator records the partition as lost.
pub(crate) fn run_partition(
    partition: Partition,
    interval_hours: u32,
    strategy: Arc<dyn MetricStrategy>,
    aggregator: Arc<dyn Aggregator>,
    cohort: Cohort,
    options: EngineOptions,
    tx: mpsc::Sender<ResultRow>,
) -> WorkerReport {
    let schema = strategy.field_schema();
    let mut report = WorkerReport {
        partition_index: partition.index,
        rows_emitted: 0,
        skipped: Vec::new(),
        failure: None,
    };

    for window in partition.windows(interval_hours) {
        if options.log {
            info!(
                partition = partition.index,
                window_start = %window.start,
                window_end = %window.end,
                "processing window"
            );
        }

        match compute_window(&*strategy, &*aggregator, window, &cohort, &options, &schema) {
            Ok(row) => {
                // The receiver only disappears when the coordinator is gone;
                // nothing useful is left to do.
                if tx.blocking_send(row).is_err() {
                    break;
                }
                report.rows_emitted += 1;
            }
            Err(err) => match options.error_policy {
                ErrorPolicy::FailSoft => {
                    warn!(
                        partition = partition.index,
                        window_start = %window.start,
                        error = %err,
                        "window computation failed, skipping window"
                    );
                    report.skipped.push(SkippedWindow {
                        window,
                        reason: err.to_string(),
                    });
                }
                ErrorPolicy::FailFast => {
                    warn!(
                        partition = partition.index,
                        window_start = %window.start,
                        error = %err,
                        "window computation failed, stopping partition"
                    );
                    report.failure = Some((window.start, err));
                    break;
                }
            },
        }
    }

    report
}

/// Strategy + aggregator invocation for a single window.
fn compute_window(
    strategy: &dyn MetricStrategy,
    aggregator: &dyn Aggregator,
    window: TimeWindow,
    cohort: &Cohort,
    options: &EngineOptions,
    schema: &FieldSchema,
) -> anyhow::Result<ResultRow> {
    let results = strategy.compute(window, cohort, &options.strategy)?;
    let summary = aggregator.reduce(&results, schema)?;
    Ok(ResultRow {
        window,
        fields: summary.fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeBound;
    use crate::options::StrategyOptions;
    use crate::strategy::{EntityRecord, EntityResults, SumAggregator};
    use anyhow::bail;

    fn ts(text: &str) -> DateTime<Utc> {
        TimeBound::from(text).resolve().unwrap()
    }

    /// Counts cohort members, failing on one designated window start.
    struct CountingStrategy {
        poison: Option<DateTime<Utc>>,
    }

    impl MetricStrategy for CountingStrategy {
        fn field_schema(&self) -> FieldSchema {
            FieldSchema::new(["present"])
        }

        fn compute(
            &self,
            window: TimeWindow,
            cohort: &Cohort,
            _options: &StrategyOptions,
        ) -> anyhow::Result<EntityResults> {
            if self.poison == Some(window.start) {
                bail!("poisoned window");
            }
            Ok(cohort
                .iter()
                .map(|entity| EntityRecord {
                    entity,
                    values: vec![1.0],
                })
                .collect())
        }
    }

    fn run(
        poison: Option<DateTime<Utc>>,
        policy: ErrorPolicy,
    ) -> (WorkerReport, Vec<ResultRow>) {
        let partition = Partition {
            index: 0,
            start: ts("2012-01-01"),
            end: ts("2012-01-06"),
        };
        let options = EngineOptions {
            error_policy: policy,
            ..EngineOptions::default()
        };
        let (tx, mut rx) = mpsc::channel(16);

        let report = run_partition(
            partition,
            24,
            Arc::new(CountingStrategy { poison }),
            Arc::new(SumAggregator),
            Cohort::new([1, 2, 3]),
            options,
            tx,
        );

        let mut rows = Vec::new();
        while let Ok(row) = rx.try_recv() {
            rows.push(row);
        }
        (report, rows)
    }

    #[test]
    fn test_emits_one_row_per_window_in_order() {
        let (report, rows) = run(None, ErrorPolicy::FailSoft);

        assert_eq!(report.rows_emitted, 5);
        assert!(report.skipped.is_empty());
        assert!(report.failure.is_none());
        assert_eq!(rows.len(), 5);
        for pair in rows.windows(2) {
            assert!(pair[0].window.start < pair[1].window.start);
        }
        assert!(rows.iter().all(|r| r.fields == vec![3.0]));
    }

    #[test]
    fn test_fail_soft_skips_and_continues() {
        let (report, rows) = run(Some(ts("2012-01-03")), ErrorPolicy::FailSoft);

        assert_eq!(rows.len(), 4);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].window.start, ts("2012-01-03"));
        assert!(report.failure.is_none());
        // The remaining four windows are the correct four, still in order.
        let starts: Vec<DateTime<Utc>> = rows.iter().map(|r| r.window.start).collect();
        assert_eq!(
            starts,
            vec![
                ts("2012-01-01"),
                ts("2012-01-02"),
                ts("2012-01-04"),
                ts("2012-01-05")
            ]
        );
    }

    #[test]
    fn test_fail_fast_stops_partition() {
        let (report, rows) = run(Some(ts("2012-01-03")), ErrorPolicy::FailFast);

        assert_eq!(rows.len(), 2);
        assert!(report.skipped.is_empty());
        let (window_start, _) = report.failure.expect("failure recorded");
        assert_eq!(window_start, ts("2012-01-03"));
    }
}
