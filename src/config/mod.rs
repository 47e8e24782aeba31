//! Configuration file model
//!
//! The collector is driven by a single JSON file: output settings and an
//! ad hoc query list under `metricsConfig`, plus one metric catalog per
//! discovered resource type at the top level. Every section is optional; a
//! missing catalog simply means that resource type emits nothing.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::context::RunContext;
use crate::model::{Dimension, MetricQuery, DEFAULT_PERIOD};
use crate::pipeline::catalog::MetricCatalog;

/// Default global prefix for the legacy output format.
pub const DEFAULT_CARBON_PREFIX: &str = "cloudwatch";

/// Top-level configuration file shape.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "metricsConfig")]
    pub metrics_config: MetricsConfig,
    #[serde(rename = "ELBMetrics")]
    pub elb_metrics: MetricCatalog,
    #[serde(rename = "RDSMetrics")]
    pub rds_metrics: MetricCatalog,
    #[serde(rename = "elasticCacheMetrics")]
    pub elastic_cache_metrics: MetricCatalog,
    #[serde(rename = "ECSClusterMetrics")]
    pub ecs_cluster_metrics: MetricCatalog,
    #[serde(rename = "ECSServiceMetrics")]
    pub ecs_service_metrics: MetricCatalog,
    #[serde(rename = "LambdaMetrics")]
    pub lambda_metrics: MetricCatalog,
}

impl Config {
    /// Load and parse the configuration file.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Output settings and the flat ad hoc query list.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Ad hoc queries that bypass discovery and catalog expansion.
    pub metrics: Vec<AdHocMetric>,
    /// Global namespace root prepended in the legacy format.
    #[serde(rename = "carbonNameSpacePrefix")]
    pub carbon_namespace_prefix: String,
    /// Emit the legacy naming scheme instead of the current one.
    #[serde(rename = "legacyFormat")]
    pub legacy_format: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            metrics: Vec::new(),
            carbon_namespace_prefix: DEFAULT_CARBON_PREFIX.to_string(),
            legacy_format: false,
        }
    }
}

/// One configured ad hoc query, in the raw CloudWatch parameter shape.
///
/// The file format carries a `Statistics` array; each element becomes its own
/// singular-statistic query so the one-statistic-per-query invariant holds.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdHocMetric {
    pub namespace: String,
    pub metric_name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub statistics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub period: Option<i32>,
}

impl AdHocMetric {
    /// Expand into one query per listed statistic, stamped with the run's
    /// shared time window.
    pub fn queries(&self, ctx: &RunContext) -> Vec<MetricQuery> {
        self.statistics
            .iter()
            .map(|statistic| MetricQuery {
                namespace: self.namespace.clone(),
                metric_name: self.metric_name.clone(),
                unit: self.unit.clone(),
                statistic: statistic.clone(),
                dimensions: self.dimensions.clone(),
                period: self.period.unwrap_or(DEFAULT_PERIOD),
                start_time: ctx.start_time,
                end_time: ctx.end_time,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{LineFormat, LineFormatter};

    const SAMPLE: &str = r#"{
        "metricsConfig": {
            "metrics": [
                {
                    "Namespace": "AWS/SQS",
                    "MetricName": "NumberOfMessagesSent",
                    "Unit": "Count",
                    "Statistics": ["Sum", "Average"],
                    "Dimensions": [{"Name": "QueueName", "Value": "jobs"}],
                    "Period": 300
                }
            ],
            "carbonNameSpacePrefix": "aws.metrics",
            "legacyFormat": true
        },
        "ELBMetrics": {
            "Count": [["RequestCount", "Sum"]],
            "Seconds": [["Latency", "Average"]]
        },
        "LambdaMetrics": {
            "Count": [["Invocations", "Sum"], ["Errors", "Sum"]]
        }
    }"#;

    fn context() -> RunContext {
        RunContext::new(LineFormatter::new(LineFormat::Current, "cloudwatch"))
    }

    #[test]
    fn test_parse_sample_config() {
        let config: Config = serde_json::from_str(SAMPLE).expect("sample should parse");

        assert_eq!(config.metrics_config.metrics.len(), 1);
        assert_eq!(config.metrics_config.carbon_namespace_prefix, "aws.metrics");
        assert!(config.metrics_config.legacy_format);
        assert_eq!(config.elb_metrics.len(), 2);
        assert_eq!(config.lambda_metrics.len(), 2);
        assert!(config.rds_metrics.is_empty());
        assert!(config.ecs_cluster_metrics.is_empty());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = serde_json::from_str("{}").expect("empty config should parse");

        assert!(config.metrics_config.metrics.is_empty());
        assert_eq!(
            config.metrics_config.carbon_namespace_prefix,
            DEFAULT_CARBON_PREFIX
        );
        assert!(!config.metrics_config.legacy_format);
        assert!(config.elb_metrics.is_empty());
        assert!(config.elastic_cache_metrics.is_empty());
    }

    #[test]
    fn test_ad_hoc_metric_expands_one_query_per_statistic() {
        let config: Config = serde_json::from_str(SAMPLE).unwrap();
        let ctx = context();

        let queries = config.metrics_config.metrics[0].queries(&ctx);
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].statistic, "Sum");
        assert_eq!(queries[1].statistic, "Average");
        for query in &queries {
            assert_eq!(query.namespace, "AWS/SQS");
            assert_eq!(query.metric_name, "NumberOfMessagesSent");
            assert_eq!(query.period, 300);
            assert_eq!(query.dimensions, vec![Dimension::new("QueueName", "jobs")]);
            assert_eq!(query.start_time, ctx.start_time);
            assert_eq!(query.end_time, ctx.end_time);
        }
    }

    #[test]
    fn test_ad_hoc_metric_defaults_period() {
        let metric: AdHocMetric = serde_json::from_str(
            r#"{"Namespace": "AWS/SQS", "MetricName": "X", "Statistics": ["Sum"]}"#,
        )
        .unwrap();

        let queries = metric.queries(&context());
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].period, DEFAULT_PERIOD);
        assert!(queries[0].dimensions.is_empty());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/conf.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/conf.json"));
    }
}
