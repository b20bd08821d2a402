//! Tidemark demo binary.
//!
//! Builds a daily time series over eleven days of simulated editing activity
//! for a small cohort and prints the assembled series as JSON. The strategy
//! here is a stand-in for a real metric (retention, revert rate, ...); the
//! engine only sees it through the [`MetricStrategy`] seam.
//!
//! Set `TIDEMARK_CONCURRENCY` to change the worker count.

use std::env;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tidemark::engine::build_time_series;
use tidemark::model::{Cohort, TimeWindow};
use tidemark::options::{EngineOptions, StrategyOptions};
use tidemark::strategy::{
    EntityRecord, EntityResults, FieldSchema, MetricStrategy, SumAggregator,
};

/// Default number of coordinator-level workers.
const DEFAULT_CONCURRENCY: usize = 4;

/// Deterministic simulated activity: each entity contributes an edit count
/// derived from its id and the window's day, plus a survival flag.
struct SimulatedActivity;

impl MetricStrategy for SimulatedActivity {
    fn field_schema(&self) -> FieldSchema {
        FieldSchema::new(["edit_count", "surviving"])
    }

    fn compute(
        &self,
        window: TimeWindow,
        cohort: &Cohort,
        _options: &StrategyOptions,
    ) -> anyhow::Result<EntityResults> {
        let day = window.start.timestamp() / 86_400;
        Ok(cohort
            .iter()
            .map(|entity| {
                let edits = ((entity as i64 + day) % 7) as f64;
                let surviving = if edits > 0.0 { 1.0 } else { 0.0 };
                EntityRecord {
                    entity,
                    values: vec![edits, surviving],
                }
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tidemark=info".parse()?))
        .init();

    let concurrency: usize = env::var("TIDEMARK_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CONCURRENCY);

    let cohort: Cohort = (1..=64).collect();

    info!(concurrency, cohort_size = cohort.len(), "building demo time series");

    let series = build_time_series(
        "20120101000000",
        "20120112000000",
        24,
        Arc::new(SimulatedActivity),
        Arc::new(SumAggregator),
        cohort,
        EngineOptions {
            concurrency,
            log: true,
            ..EngineOptions::default()
        },
    )
    .await?;

    info!(rows = series.len(), complete = series.is_complete(), "series built");

    println!("{}", serde_json::to_string_pretty(&series)?);

    Ok(())
}
