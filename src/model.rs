//! Core data model shared by the whole pipeline
//!
//! Everything here is transient and single-run: queries are built once from
//! discovery results and configuration, data points are consumed exactly once
//! by a formatter, and nothing is mutated after construction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Default aggregation period in seconds for catalog-expanded queries.
pub const DEFAULT_PERIOD: i32 = 60;

/// A name/value tag narrowing a metric to one resource instance.
///
/// Serialized in PascalCase to match the CloudWatch wire shape and the
/// configuration file (`{"Name": ..., "Value": ...}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Dimension {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A fully specified statistic request against the monitoring API.
///
/// The statistic is singular even though the underlying protocol accepts a
/// set: the pipeline always issues one statistic per query so every output
/// line maps back to exactly one (metric, statistic) pair.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub unit: String,
    pub statistic: String,
    /// Ordered dimension set. Order matters for formatting, not for the
    /// query itself.
    pub dimensions: Vec<Dimension>,
    pub period: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

/// One aggregated data point returned for a query.
#[derive(Clone, Debug, Default)]
pub struct DataPoint {
    /// Unix timestamp of the aggregation bucket, in seconds.
    pub timestamp: i64,
    /// Statistic values present on this point, keyed by statistic name
    /// ("Average", "Sum", ...).
    pub stats: HashMap<String, f64>,
}

impl DataPoint {
    /// Build a point carrying a single statistic value.
    pub fn single(timestamp: i64, statistic: impl Into<String>, value: f64) -> Self {
        let mut stats = HashMap::new();
        stats.insert(statistic.into(), value);
        DataPoint { timestamp, stats }
    }
}
