//! Graphite line-protocol formatters
//!
//! Two incompatible naming schemes coexist: the current format keys each
//! dimension as `Name_Value` and keeps the original casing, while the legacy
//! format (kept for installations with historic Graphite trees) uses only
//! dimension values, appends statistic and unit, lowercases the whole path
//! and prepends a configured global prefix.
//!
//! Both produce one line per data point: `<path> <value> <epoch-seconds>`.
//! The variant is selected once per run from configuration.

use crate::model::{DataPoint, MetricQuery};

/// Which of the two naming schemes a run emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineFormat {
    /// `Namespace-with-dots.Name_Value[...].MetricName value epoch`
    Current,
    /// `prefix.namespace-with-dots.value[...].metricname.statistic.unit`
    /// with the metric path fully lowercased.
    Legacy,
}

/// Formatter chosen once at startup; pure function of query and data points.
#[derive(Clone, Debug)]
pub struct LineFormatter {
    format: LineFormat,
    /// Global namespace root for the legacy format ("cloudwatch" by default).
    prefix: String,
}

impl LineFormatter {
    pub fn new(format: LineFormat, prefix: impl Into<String>) -> Self {
        LineFormatter {
            format,
            prefix: prefix.into(),
        }
    }

    /// Render one line per data point, in data-point order.
    ///
    /// A data point that does not carry the query's statistic produces no
    /// line; zero data points produce an empty sequence, not an error.
    pub fn format(&self, query: &MetricQuery, points: &[DataPoint]) -> Vec<String> {
        points
            .iter()
            .filter_map(|point| {
                let value = *point.stats.get(&query.statistic)?;
                Some(match self.format {
                    LineFormat::Current => current_line(query, value, point.timestamp),
                    LineFormat::Legacy => legacy_line(&self.prefix, query, value, point.timestamp),
                })
            })
            .collect()
    }
}

fn current_line(query: &MetricQuery, value: f64, timestamp: i64) -> String {
    let dimension_prefix = query
        .dimensions
        .iter()
        .map(|dim| format!("{}_{}", dim.name, dim.value))
        .collect::<Vec<_>>()
        .join(".");

    format!(
        "{}.{}.{} {} {}",
        query.namespace.replace('/', "."),
        dimension_prefix,
        query.metric_name,
        value,
        timestamp
    )
}

fn legacy_line(prefix: &str, query: &MetricQuery, value: f64, timestamp: i64) -> String {
    // Legacy paths use only the dimension values, not the names.
    let dimension_prefix = query
        .dimensions
        .iter()
        .map(|dim| dim.value.as_str())
        .collect::<Vec<_>>()
        .join(".");

    let name = format!(
        "{}.{}.{}.{}.{}",
        query.namespace.replace('/', "."),
        dimension_prefix,
        query.metric_name,
        query.statistic,
        query.unit
    );

    format!("{}.{} {} {}", prefix, name.to_lowercase(), value, timestamp)
}
