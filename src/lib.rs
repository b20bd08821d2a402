//! Tidemark - a parallel time-windowed aggregation engine for cohort
//! behavioral metrics.
//!
//! # Overview
//!
//! Tidemark computes aggregate behavioral metrics (editor-retention rate,
//! revert rate, and similar) over a long date range by partitioning the range
//! into fixed-width time windows, evaluating a pluggable metric strategy over
//! a cohort of entities for each window in parallel, and reassembling the
//! per-window results into a single time-ordered series.
//!
//! The metric computation itself is external: callers supply a
//! [`MetricStrategy`](strategy::MetricStrategy) (per-window, per-entity
//! computation) and an [`Aggregator`](strategy::Aggregator) (reducer to one
//! summary row per window). The engine owns window derivation, partitioning,
//! worker fan-out, result collection, and ordering.
//!
//! # Modules
//!
//! - [`model`]: windows, cohorts, result rows, and the series envelope
//! - [`error`]: the engine's error kinds
//! - [`window`]: window boundary derivation
//! - [`partition`]: splitting a range across workers
//! - [`strategy`]: the pluggable strategy/aggregator seams
//! - [`options`]: typed engine and strategy configuration
//! - [`engine`]: the parallel coordinator, [`engine::build_time_series`]
//! - [`sequential`]: the single-process variant for time-varying cohorts

pub mod engine;
pub mod error;
pub mod model;
pub mod options;
pub mod partition;
pub mod sequential;
pub mod strategy;
pub mod window;

mod worker;
