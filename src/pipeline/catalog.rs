//! Metric catalog expansion
//!
//! A catalog maps a unit name to the (metric, statistic) pairs collected for
//! one resource type. Catalogs come straight from configuration, are never
//! mutated, and expand into concrete queries once a resource's dimensions are
//! known.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::context::RunContext;
use crate::model::{Dimension, MetricQuery, DEFAULT_PERIOD};
use crate::pipeline::discovery::ResourceId;

/// One catalog row, deserialized from a `["MetricName", "Statistic"]` pair.
#[derive(Clone, Debug, Deserialize)]
pub struct CatalogEntry(pub String, pub String);

impl CatalogEntry {
    pub fn metric_name(&self) -> &str {
        &self.0
    }

    pub fn statistic(&self) -> &str {
        &self.1
    }
}

/// Configuration-provided metric catalog for one resource type, grouped by
/// unit. The map is ordered so expansion order is stable across runs.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MetricCatalog(pub BTreeMap<String, Vec<CatalogEntry>>);

impl MetricCatalog {
    /// Total number of (metric, statistic) entries across all units.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Expand every catalog entry into one query carrying the given
    /// namespace, dimensions and the run's shared time window.
    ///
    /// Order follows catalog iteration order (unit, then entry). Entries are
    /// not deduplicated: a metric listed twice yields two queries.
    pub fn expand(
        &self,
        namespace: &str,
        dimensions: &[Dimension],
        ctx: &RunContext,
    ) -> Vec<MetricQuery> {
        let mut queries = Vec::with_capacity(self.len());
        for (unit, entries) in &self.0 {
            for entry in entries {
                queries.push(MetricQuery {
                    namespace: namespace.to_string(),
                    metric_name: entry.metric_name().to_string(),
                    unit: unit.clone(),
                    statistic: entry.statistic().to_string(),
                    dimensions: dimensions.to_vec(),
                    period: DEFAULT_PERIOD,
                    start_time: ctx.start_time,
                    end_time: ctx.end_time,
                });
            }
        }
        queries
    }

    /// Expand against a discovered resource, using its namespace and
    /// dimension rule.
    pub fn expand_for(&self, resource: &ResourceId, ctx: &RunContext) -> Vec<MetricQuery> {
        self.expand(resource.namespace(), &resource.dimensions(), ctx)
    }
}
