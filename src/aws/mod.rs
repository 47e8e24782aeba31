//! Monitoring and inventory API boundary
//!
//! The collector never talks to AWS directly; it goes through the `CloudApi`
//! trait so the orchestrator can be exercised against a mock in tests. The
//! production implementation over the AWS SDK lives in [`client`].

pub mod client;

use anyhow::Result;

use crate::model::{DataPoint, MetricQuery};

/// Black-box inventory and statistics executor.
///
/// Each inventory call returns the live identifiers of one resource type; a
/// call either completes or fails once, and callers must not retry. The
/// futures are awaited on a single task, so no `Send` bound is required.
#[allow(async_fn_in_trait)]
pub trait CloudApi {
    /// Names of all classic load balancers.
    async fn list_load_balancers(&self) -> Result<Vec<String>>;

    /// Identifiers of all relational database instances.
    async fn list_db_instances(&self) -> Result<Vec<String>>;

    /// Cache clusters with their node ids, as `(cluster_id, node_ids)`.
    async fn list_cache_clusters(&self) -> Result<Vec<(String, Vec<String>)>>;

    /// ARNs of all container clusters.
    async fn list_cluster_arns(&self) -> Result<Vec<String>>;

    /// ARNs of the services running in one cluster.
    async fn list_service_arns(&self, cluster_arn: &str) -> Result<Vec<String>>;

    /// Display name of a cluster, resolved from its ARN.
    async fn resolve_cluster_name(&self, cluster_arn: &str) -> Result<String>;

    /// Display names of services, resolved from their ARNs within a cluster.
    async fn resolve_service_names(
        &self,
        cluster_name: &str,
        service_arns: &[String],
    ) -> Result<Vec<String>>;

    /// Names of all serverless functions.
    async fn list_functions(&self) -> Result<Vec<String>>;

    /// Execute one statistic query over its embedded time window.
    async fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<DataPoint>>;
}
