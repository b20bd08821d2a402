//! Pluggable metric computation seams.
//!
//! The engine never computes a metric itself. A [`MetricStrategy`] evaluates
//! one window over a cohort and returns per-entity numeric records; an
//! [`Aggregator`] folds those records into a single summary row. Both are
//! supplied by the caller and treated as opaque: a strategy may run its own
//! internal parallelism, controlled through
//! [`StrategyOptions`](crate::options::StrategyOptions).
//!
//! Failures at this seam are opaque `anyhow` errors; the engine decides per
//! its error policy whether to skip the window or abort the partition.

use serde::Serialize;

use crate::model::{Cohort, EntityId, TimeWindow};
use crate::options::StrategyOptions;

/// Ordered names of the numeric fields a strategy produces per entity.
///
/// Field order defines the order of values in [`EntityRecord::values`] and in
/// the final [`ResultRow::fields`](crate::model::ResultRow::fields).
#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema(Vec<String>);

impl FieldSchema {
    /// Build a schema from ordered field names.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The ordered field names.
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

/// One entity's computed metric values for one window.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRecord {
    /// The entity the values belong to.
    pub entity: EntityId,

    /// Numeric values, ordered per the strategy's [`FieldSchema`].
    pub values: Vec<f64>,
}

/// The full per-entity result set a strategy produces for one window.
pub type EntityResults = Vec<EntityRecord>;

/// A single summary row reduced from a window's per-entity results.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    /// Ordered numeric summary fields.
    pub fields: Vec<f64>,
}

/// A pluggable per-window metric computation.
pub trait MetricStrategy: Send + Sync {
    /// The ordered field names this strategy produces per entity.
    fn field_schema(&self) -> FieldSchema;

    /// Evaluate the metric for every entity of `cohort` over `window`.
    fn compute(
        &self,
        window: TimeWindow,
        cohort: &Cohort,
        options: &StrategyOptions,
    ) -> anyhow::Result<EntityResults>;
}

/// A pluggable reducer collapsing per-entity results to one summary row.
pub trait Aggregator: Send + Sync {
    /// Reduce `results` to a single record whose fields follow `schema`.
    fn reduce(&self, results: &EntityResults, schema: &FieldSchema)
    -> anyhow::Result<SummaryRecord>;
}

/// Sums each field across all entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumAggregator;

impl Aggregator for SumAggregator {
    fn reduce(
        &self,
        results: &EntityResults,
        schema: &FieldSchema,
    ) -> anyhow::Result<SummaryRecord> {
        let mut fields = vec![0.0; schema.len()];
        for record in results {
            for (total, value) in fields.iter_mut().zip(&record.values) {
                *total += value;
            }
        }
        Ok(SummaryRecord { fields })
    }
}

/// Averages each field across all entities. An empty result set reduces to
/// all-zero fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAggregator;

impl Aggregator for MeanAggregator {
    fn reduce(
        &self,
        results: &EntityResults,
        schema: &FieldSchema,
    ) -> anyhow::Result<SummaryRecord> {
        let mut fields = SumAggregator.reduce(results, schema)?.fields;
        if !results.is_empty() {
            let count = results.len() as f64;
            for field in &mut fields {
                *field /= count;
            }
        }
        Ok(SummaryRecord { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_results() -> EntityResults {
        vec![
            EntityRecord {
                entity: 1,
                values: vec![4.0, 1.0],
            },
            EntityRecord {
                entity: 2,
                values: vec![6.0, 0.0],
            },
        ]
    }

    #[test]
    fn test_sum_aggregator() {
        let schema = FieldSchema::new(["edits", "surviving"]);
        let summary = SumAggregator.reduce(&sample_results(), &schema).unwrap();
        assert_eq!(summary.fields, vec![10.0, 1.0]);
    }

    #[test]
    fn test_mean_aggregator() {
        let schema = FieldSchema::new(["edits", "surviving"]);
        let summary = MeanAggregator.reduce(&sample_results(), &schema).unwrap();
        assert_eq!(summary.fields, vec![5.0, 0.5]);
    }

    #[test]
    fn test_aggregators_handle_empty_results() {
        let schema = FieldSchema::new(["edits"]);
        let sum = SumAggregator.reduce(&vec![], &schema).unwrap();
        let mean = MeanAggregator.reduce(&vec![], &schema).unwrap();
        assert_eq!(sum.fields, vec![0.0]);
        assert_eq!(mean.fields, vec![0.0]);
    }
}
