//! Production `CloudApi` implementation over the AWS SDK
//!
//! One shared SDK configuration (default credential provider chain, optional
//! region override) backs a client per service. Calls are single best-effort
//! attempts; the pipeline absorbs failures, so no retry logic lives here.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Datapoint, Dimension, StandardUnit, Statistic};
use tracing::debug;

use super::CloudApi;
use crate::model::{DataPoint, MetricQuery};

/// Inventory and statistics clients built from one shared SDK configuration.
pub struct AwsApi {
    cloudwatch: aws_sdk_cloudwatch::Client,
    elb: aws_sdk_elasticloadbalancing::Client,
    rds: aws_sdk_rds::Client,
    elasticache: aws_sdk_elasticache::Client,
    ecs: aws_sdk_ecs::Client,
    lambda: aws_sdk_lambda::Client,
}

impl AwsApi {
    /// Resolve the SDK configuration (default provider chain, optionally
    /// pinned to a region) and build all service clients from it.
    pub async fn connect(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let shared = loader.load().await;
        debug!(region = ?shared.region(), "Resolved AWS SDK configuration");

        AwsApi {
            cloudwatch: aws_sdk_cloudwatch::Client::new(&shared),
            elb: aws_sdk_elasticloadbalancing::Client::new(&shared),
            rds: aws_sdk_rds::Client::new(&shared),
            elasticache: aws_sdk_elasticache::Client::new(&shared),
            ecs: aws_sdk_ecs::Client::new(&shared),
            lambda: aws_sdk_lambda::Client::new(&shared),
        }
    }
}

impl CloudApi for AwsApi {
    async fn list_load_balancers(&self) -> Result<Vec<String>> {
        let output = self.elb.describe_load_balancers().send().await?;
        Ok(output
            .load_balancer_descriptions()
            .iter()
            .filter_map(|lb| lb.load_balancer_name().map(str::to_string))
            .collect())
    }

    async fn list_db_instances(&self) -> Result<Vec<String>> {
        let output = self.rds.describe_db_instances().send().await?;
        Ok(output
            .db_instances()
            .iter()
            .filter_map(|db| db.db_instance_identifier().map(str::to_string))
            .collect())
    }

    async fn list_cache_clusters(&self) -> Result<Vec<(String, Vec<String>)>> {
        let output = self
            .elasticache
            .describe_cache_clusters()
            .show_cache_node_info(true)
            .send()
            .await?;
        Ok(output
            .cache_clusters()
            .iter()
            .filter_map(|cluster| {
                let id = cluster.cache_cluster_id()?.to_string();
                let nodes = cluster
                    .cache_nodes()
                    .iter()
                    .filter_map(|node| node.cache_node_id().map(str::to_string))
                    .collect();
                Some((id, nodes))
            })
            .collect())
    }

    async fn list_cluster_arns(&self) -> Result<Vec<String>> {
        let output = self.ecs.list_clusters().send().await?;
        Ok(output.cluster_arns().to_vec())
    }

    async fn list_service_arns(&self, cluster_arn: &str) -> Result<Vec<String>> {
        let output = self.ecs.list_services().cluster(cluster_arn).send().await?;
        Ok(output.service_arns().to_vec())
    }

    async fn resolve_cluster_name(&self, cluster_arn: &str) -> Result<String> {
        let output = self
            .ecs
            .describe_clusters()
            .clusters(cluster_arn)
            .send()
            .await?;
        output
            .clusters()
            .first()
            .and_then(|cluster| cluster.cluster_name())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no cluster description returned for {}", cluster_arn))
    }

    async fn resolve_service_names(
        &self,
        cluster_name: &str,
        service_arns: &[String],
    ) -> Result<Vec<String>> {
        let output = self
            .ecs
            .describe_services()
            .cluster(cluster_name)
            .set_services(Some(service_arns.to_vec()))
            .send()
            .await?;
        Ok(output
            .services()
            .iter()
            .filter_map(|service| service.service_name().map(str::to_string))
            .collect())
    }

    async fn list_functions(&self) -> Result<Vec<String>> {
        let output = self.lambda.list_functions().send().await?;
        Ok(output
            .functions()
            .iter()
            .filter_map(|function| function.function_name().map(str::to_string))
            .collect())
    }

    async fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<DataPoint>> {
        let mut request = self
            .cloudwatch
            .get_metric_statistics()
            .namespace(&query.namespace)
            .metric_name(&query.metric_name)
            .unit(StandardUnit::from(query.unit.as_str()))
            .statistics(Statistic::from(query.statistic.as_str()))
            .period(query.period)
            .start_time(DateTime::from_secs(query.start_time.unix_timestamp()))
            .end_time(DateTime::from_secs(query.end_time.unix_timestamp()));
        for dim in &query.dimensions {
            request = request.dimensions(
                Dimension::builder()
                    .name(&dim.name)
                    .value(&dim.value)
                    .build(),
            );
        }

        let output = request.send().await?;
        Ok(output.datapoints().iter().map(data_point_from).collect())
    }
}

/// Flatten an SDK data point into the statistic map keyed by statistic name.
fn data_point_from(point: &Datapoint) -> DataPoint {
    let mut stats = HashMap::new();
    if let Some(value) = point.average() {
        stats.insert("Average".to_string(), value);
    }
    if let Some(value) = point.sum() {
        stats.insert("Sum".to_string(), value);
    }
    if let Some(value) = point.maximum() {
        stats.insert("Maximum".to_string(), value);
    }
    if let Some(value) = point.minimum() {
        stats.insert("Minimum".to_string(), value);
    }
    if let Some(value) = point.sample_count() {
        stats.insert("SampleCount".to_string(), value);
    }

    DataPoint {
        timestamp: point.timestamp().map(DateTime::secs).unwrap_or_default(),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_point_flattening() {
        let point = Datapoint::builder()
            .average(0.42)
            .sum(12.6)
            .timestamp(DateTime::from_secs(1_700_000_000))
            .build();

        let flattened = data_point_from(&point);
        assert_eq!(flattened.timestamp, 1_700_000_000);
        assert_eq!(flattened.stats.get("Average"), Some(&0.42));
        assert_eq!(flattened.stats.get("Sum"), Some(&12.6));
        assert!(flattened.stats.get("Maximum").is_none());
    }

    #[test]
    fn test_data_point_without_timestamp_defaults_to_epoch() {
        let point = Datapoint::builder().average(1.0).build();
        assert_eq!(data_point_from(&point).timestamp, 0);
    }
}
