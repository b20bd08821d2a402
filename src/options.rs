//! Engine configuration.
//!
//! Options are plain typed structs: engine-level settings live on
//! [`EngineOptions`], and anything meant for the metric strategy itself is
//! carried in the named [`StrategyOptions`] sub-struct, which the engine
//! passes through untouched. There is no dynamic key re-mapping; a strategy
//! reads its own knobs from `StrategyOptions::params`.

use serde::{Deserialize, Serialize};

/// How the engine reacts when a single window's computation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Skip the failing window, record it in the series metadata, and keep
    /// going. This is the default.
    #[default]
    FailSoft,

    /// Stop the failing worker's partition and surface the error from the
    /// build call once the remaining workers have drained.
    FailFast,
}

/// Options consumed by the metric strategy, opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOptions {
    /// Worker count for the strategy's own internal parallelism, if any.
    #[serde(default = "default_strategy_concurrency")]
    pub concurrency: usize,

    /// Strategy-specific pass-through parameters (e.g. a survival threshold
    /// in minutes). Keys and meanings are defined by the strategy.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            concurrency: default_strategy_concurrency(),
            params: serde_json::Map::new(),
        }
    }
}

fn default_strategy_concurrency() -> usize {
    1
}

/// Top-level configuration for a time-series build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Number of coordinator-level workers (default: 1).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Enables per-window progress reporting.
    #[serde(default)]
    pub log: bool,

    /// Per-window failure handling policy.
    #[serde(default)]
    pub error_policy: ErrorPolicy,

    /// Options forwarded verbatim to the metric strategy.
    #[serde(default)]
    pub strategy: StrategyOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            log: false,
            error_policy: ErrorPolicy::default(),
            strategy: StrategyOptions::default(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}
