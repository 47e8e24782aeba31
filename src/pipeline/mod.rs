//! Collection pipeline - drives discovery, expansion, querying and emission
//!
//! One `Collector::run` is one complete collection cycle. The six pipelines
//! (five resource types plus the ad hoc list from configuration) are
//! dispatched concurrently and are fully independent: a discovery failure in
//! one degrades that pipeline to an empty inventory and never aborts the
//! others. Within the container pipeline the stages are strictly sequential
//! because each stage needs the previous stage's results.

pub mod catalog;
pub mod discovery;

use std::io::Write;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::aws::CloudApi;
use crate::config::Config;
use crate::context::RunContext;
use crate::model::MetricQuery;
use discovery::{cache_nodes_from, ResourceId};

/// Orchestrates one collection run: discovery, catalog expansion, query
/// execution, formatting and emission.
pub struct Collector<A, W> {
    api: A,
    config: Config,
    ctx: RunContext,
    // Queries run concurrently but every query's lines are written in one
    // locked section, so lines for a single query stay contiguous.
    sink: Mutex<W>,
}

impl<A: CloudApi, W: Write> Collector<A, W> {
    pub fn new(api: A, config: Config, ctx: RunContext, sink: W) -> Self {
        Collector {
            api,
            config,
            ctx,
            sink: Mutex::new(sink),
        }
    }

    /// Recover the output sink, mainly for tests.
    pub fn into_sink(self) -> W {
        self.sink.into_inner()
    }

    /// Run one full collection cycle across all resource types.
    ///
    /// There is no fatal outcome: partial failures are absorbed per pipeline
    /// and the run always completes. Total absence of output is valid.
    pub async fn run(&self) {
        let cycle_start = Instant::now();
        info!("Starting collection cycle");

        let results = tokio::join!(
            self.load_balancer_pipeline(),
            self.db_instance_pipeline(),
            self.cache_node_pipeline(),
            self.container_pipeline(),
            self.function_pipeline(),
            self.ad_hoc_pipeline(),
        );

        let (emitted, failed) = [
            results.0, results.1, results.2, results.3, results.4, results.5,
        ]
        .iter()
        .fold((0, 0), |(e, f), (pe, pf)| (e + pe, f + pf));

        info!(
            lines_emitted = emitted,
            queries_failed = failed,
            duration_ms = cycle_start.elapsed().as_millis() as u64,
            "Collection cycle completed"
        );
    }

    async fn load_balancer_pipeline(&self) -> (usize, usize) {
        let names = match self.api.list_load_balancers().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Load balancer discovery failed, continuing with empty inventory");
                Vec::new()
            }
        };
        debug!(count = names.len(), "Discovered load balancers");

        let mut queries = Vec::new();
        for name in names {
            let resource = ResourceId::LoadBalancer(name);
            queries.extend(self.config.elb_metrics.expand_for(&resource, &self.ctx));
        }
        self.execute_all(queries).await
    }

    async fn db_instance_pipeline(&self) -> (usize, usize) {
        let instances = match self.api.list_db_instances().await {
            Ok(instances) => instances,
            Err(e) => {
                warn!(error = %e, "Database instance discovery failed, continuing with empty inventory");
                Vec::new()
            }
        };
        debug!(count = instances.len(), "Discovered database instances");

        let mut queries = Vec::new();
        for instance in instances {
            let resource = ResourceId::DbInstance(instance);
            queries.extend(self.config.rds_metrics.expand_for(&resource, &self.ctx));
        }
        self.execute_all(queries).await
    }

    async fn cache_node_pipeline(&self) -> (usize, usize) {
        let clusters = match self.api.list_cache_clusters().await {
            Ok(clusters) => clusters,
            Err(e) => {
                warn!(error = %e, "Cache cluster discovery failed, continuing with empty inventory");
                Vec::new()
            }
        };

        let resources = cache_nodes_from(clusters);
        debug!(count = resources.len(), "Discovered cache nodes");

        let mut queries = Vec::new();
        for resource in &resources {
            queries.extend(
                self.config
                    .elastic_cache_metrics
                    .expand_for(resource, &self.ctx),
            );
        }
        self.execute_all(queries).await
    }

    /// Container discovery is two-staged and hierarchical: cluster ARNs
    /// first, then per cluster its service ARNs, then display names for
    /// both. Later stages need earlier results, so the chain is sequential.
    async fn container_pipeline(&self) -> (usize, usize) {
        let cluster_arns = match self.api.list_cluster_arns().await {
            Ok(arns) => arns,
            Err(e) => {
                warn!(error = %e, "Container cluster discovery failed, continuing with empty inventory");
                Vec::new()
            }
        };
        debug!(count = cluster_arns.len(), "Discovered container clusters");

        let mut emitted = 0;
        let mut failed = 0;
        for cluster_arn in cluster_arns {
            let service_arns = match self.api.list_service_arns(&cluster_arn).await {
                Ok(arns) => arns,
                Err(e) => {
                    warn!(cluster_arn = %cluster_arn, error = %e, "Service discovery failed, continuing without services");
                    Vec::new()
                }
            };

            let cluster_name = match self.api.resolve_cluster_name(&cluster_arn).await {
                Ok(name) => name,
                Err(e) => {
                    warn!(cluster_arn = %cluster_arn, error = %e, "Cluster name resolution failed, skipping cluster");
                    continue;
                }
            };

            let service_names = if service_arns.is_empty() {
                Vec::new()
            } else {
                match self
                    .api
                    .resolve_service_names(&cluster_name, &service_arns)
                    .await
                {
                    Ok(names) => names,
                    Err(e) => {
                        warn!(cluster = %cluster_name, error = %e, "Service name resolution failed, continuing without services");
                        Vec::new()
                    }
                }
            };

            // Metrics once for the cluster itself, once per service.
            let mut queries = self
                .config
                .ecs_cluster_metrics
                .expand_for(&ResourceId::EcsCluster(cluster_name.clone()), &self.ctx);
            for service in service_names {
                queries.extend(self.config.ecs_service_metrics.expand_for(
                    &ResourceId::EcsService {
                        cluster: cluster_name.clone(),
                        service,
                    },
                    &self.ctx,
                ));
            }

            let (e, f) = self.execute_all(queries).await;
            emitted += e;
            failed += f;
        }
        (emitted, failed)
    }

    async fn function_pipeline(&self) -> (usize, usize) {
        let functions = match self.api.list_functions().await {
            Ok(functions) => functions,
            Err(e) => {
                warn!(error = %e, "Function discovery failed, continuing with empty inventory");
                Vec::new()
            }
        };
        debug!(count = functions.len(), "Discovered functions");

        let mut queries = Vec::new();
        for function in functions {
            let resource = ResourceId::Function(function);
            queries.extend(self.config.lambda_metrics.expand_for(&resource, &self.ctx));
        }
        self.execute_all(queries).await
    }

    /// Ad hoc metrics from configuration bypass discovery and expansion and
    /// go straight to querying.
    async fn ad_hoc_pipeline(&self) -> (usize, usize) {
        let mut queries = Vec::new();
        for metric in &self.config.metrics_config.metrics {
            queries.extend(metric.queries(&self.ctx));
        }
        debug!(count = queries.len(), "Expanded ad hoc metrics");
        self.execute_all(queries).await
    }

    /// Execute queries concurrently, then format and emit each result.
    ///
    /// Returns (lines emitted, queries failed). A failed query is logged
    /// together with its full contents and produces no output line.
    async fn execute_all(&self, queries: Vec<MetricQuery>) -> (usize, usize) {
        let futures: Vec<_> = queries
            .into_iter()
            .map(|query| async move {
                let result = self.api.get_metric_statistics(&query).await;
                (query, result)
            })
            .collect();
        let results = futures::future::join_all(futures).await;

        let mut emitted = 0;
        let mut failed = 0;
        for (query, result) in results {
            match result {
                Ok(points) => {
                    let lines = self.ctx.formatter.format(&query, &points);
                    emitted += lines.len();
                    if !lines.is_empty() {
                        self.emit(&lines).await;
                    }
                }
                Err(e) => {
                    failed += 1;
                    let rendered = serde_json::to_string_pretty(&query)
                        .unwrap_or_else(|_| format!("{:?}", query));
                    error!(error = %e, query = %rendered, "Statistics query failed");
                }
            }
        }
        (emitted, failed)
    }

    /// Write one query's lines contiguously.
    async fn emit(&self, lines: &[String]) {
        let mut sink = self.sink.lock().await;
        for line in lines {
            if let Err(e) = writeln!(sink, "{}", line) {
                error!(error = %e, "Failed to write output line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataPoint, Dimension};
    use crate::output::{LineFormat, LineFormatter};
    use anyhow::{anyhow, Result};
    use std::collections::HashMap;

    /// In-memory stand-in for the inventory and statistics APIs.
    #[derive(Default)]
    struct MockApi {
        load_balancers: Vec<String>,
        fail_load_balancers: bool,
        db_instances: Vec<String>,
        cache_clusters: Vec<(String, Vec<String>)>,
        cluster_arns: Vec<String>,
        service_arns: HashMap<String, Vec<String>>,
        cluster_names: HashMap<String, String>,
        functions: Vec<String>,
        fail_namespaces: Vec<String>,
        empty_results: bool,
    }

    impl CloudApi for MockApi {
        async fn list_load_balancers(&self) -> Result<Vec<String>> {
            if self.fail_load_balancers {
                return Err(anyhow!("inventory unavailable"));
            }
            Ok(self.load_balancers.clone())
        }

        async fn list_db_instances(&self) -> Result<Vec<String>> {
            Ok(self.db_instances.clone())
        }

        async fn list_cache_clusters(&self) -> Result<Vec<(String, Vec<String>)>> {
            Ok(self.cache_clusters.clone())
        }

        async fn list_cluster_arns(&self) -> Result<Vec<String>> {
            Ok(self.cluster_arns.clone())
        }

        async fn list_service_arns(&self, cluster_arn: &str) -> Result<Vec<String>> {
            Ok(self
                .service_arns
                .get(cluster_arn)
                .cloned()
                .unwrap_or_default())
        }

        async fn resolve_cluster_name(&self, cluster_arn: &str) -> Result<String> {
            self.cluster_names
                .get(cluster_arn)
                .cloned()
                .ok_or_else(|| anyhow!("unknown cluster {}", cluster_arn))
        }

        async fn resolve_service_names(
            &self,
            _cluster_name: &str,
            service_arns: &[String],
        ) -> Result<Vec<String>> {
            Ok(service_arns
                .iter()
                .map(|arn| arn.rsplit('/').next().unwrap_or(arn).to_string())
                .collect())
        }

        async fn list_functions(&self) -> Result<Vec<String>> {
            Ok(self.functions.clone())
        }

        async fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<DataPoint>> {
            if self.fail_namespaces.contains(&query.namespace) {
                return Err(anyhow!("throttled"));
            }
            if self.empty_results {
                return Ok(Vec::new());
            }
            Ok(vec![DataPoint::single(
                1_700_000_000,
                query.statistic.clone(),
                1.0,
            )])
        }
    }

    fn catalog(json: &str) -> catalog::MetricCatalog {
        serde_json::from_str(json).expect("catalog should parse")
    }

    fn context() -> RunContext {
        RunContext::new(LineFormatter::new(LineFormat::Current, "cloudwatch"))
    }

    async fn run_to_output(api: MockApi, config: Config) -> String {
        let collector = Collector::new(api, config, context(), Vec::new());
        collector.run().await;
        String::from_utf8(collector.into_sink()).expect("output should be utf-8")
    }

    #[tokio::test]
    async fn test_failing_discoverer_does_not_block_other_types() {
        let api = MockApi {
            fail_load_balancers: true,
            load_balancers: vec!["myelb".to_string()],
            db_instances: vec!["db1".to_string()],
            functions: vec!["thumbnailer".to_string()],
            ..Default::default()
        };
        let config = Config {
            elb_metrics: catalog(r#"{"Seconds": [["Latency", "Average"]]}"#),
            rds_metrics: catalog(r#"{"Percent": [["CPUUtilization", "Average"]]}"#),
            lambda_metrics: catalog(r#"{"Count": [["Invocations", "Sum"]]}"#),
            ..Default::default()
        };

        let output = run_to_output(api, config).await;
        assert!(!output.contains("AWS.ELB"), "output was: {}", output);
        assert!(output.contains("AWS.RDS.DBInstanceIdentifier_db1.CPUUtilization 1 1700000000"));
        assert!(output.contains("AWS.Lambda.FunctionName_thumbnailer.Invocations 1 1700000000"));
    }

    #[tokio::test]
    async fn test_container_pipeline_emits_cluster_and_service_lines() {
        let arn = "arn:aws:ecs:us-east-1:1:cluster/prod".to_string();
        let api = MockApi {
            cluster_arns: vec![arn.clone()],
            service_arns: HashMap::from([(
                arn.clone(),
                vec![
                    "arn:aws:ecs:us-east-1:1:service/web".to_string(),
                    "arn:aws:ecs:us-east-1:1:service/worker".to_string(),
                ],
            )]),
            cluster_names: HashMap::from([(arn, "prod".to_string())]),
            ..Default::default()
        };
        let config = Config {
            ecs_cluster_metrics: catalog(r#"{"Percent": [["CPUUtilization", "Average"]]}"#),
            ecs_service_metrics: catalog(r#"{"Percent": [["MemoryUtilization", "Average"]]}"#),
            ..Default::default()
        };

        let output = run_to_output(api, config).await;
        assert!(output.contains("AWS.ECS.ClusterName_prod.CPUUtilization 1 1700000000"));
        assert!(output
            .contains("AWS.ECS.ClusterName_prod.ServiceName_web.MemoryUtilization 1 1700000000"));
        assert!(output.contains(
            "AWS.ECS.ClusterName_prod.ServiceName_worker.MemoryUtilization 1 1700000000"
        ));
        // One cluster line plus one line per service.
        assert_eq!(output.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_cluster_without_services_still_emits_cluster_queries() {
        let arn = "arn:aws:ecs:us-east-1:1:cluster/idle".to_string();
        let api = MockApi {
            cluster_arns: vec![arn.clone()],
            cluster_names: HashMap::from([(arn, "idle".to_string())]),
            ..Default::default()
        };
        let config = Config {
            ecs_cluster_metrics: catalog(r#"{"Percent": [["CPUUtilization", "Average"]]}"#),
            ecs_service_metrics: catalog(r#"{"Percent": [["MemoryUtilization", "Average"]]}"#),
            ..Default::default()
        };

        let output = run_to_output(api, config).await;
        assert!(output.contains("AWS.ECS.ClusterName_idle.CPUUtilization 1 1700000000"));
        assert_eq!(output.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_cache_cluster_without_nodes_yields_no_queries() {
        let api = MockApi {
            cache_clusters: vec![
                ("empty".to_string(), vec![]),
                ("sessions".to_string(), vec!["0001".to_string()]),
            ],
            ..Default::default()
        };
        let config = Config {
            elastic_cache_metrics: catalog(r#"{"Percent": [["CPUUtilization", "Average"]]}"#),
            ..Default::default()
        };

        let output = run_to_output(api, config).await;
        assert!(!output.contains("CacheClusterId_empty"));
        assert!(output.contains(
            "AWS.ElastiCache.CacheClusterId_sessions.CacheNodeId_0001.CPUUtilization 1 1700000000"
        ));
    }

    #[tokio::test]
    async fn test_ad_hoc_metrics_bypass_discovery() {
        let config: Config = serde_json::from_str(
            r#"{
                "metricsConfig": {
                    "metrics": [{
                        "Namespace": "AWS/SQS",
                        "MetricName": "NumberOfMessagesSent",
                        "Unit": "Count",
                        "Statistics": ["Sum"],
                        "Dimensions": [{"Name": "QueueName", "Value": "jobs"}]
                    }]
                }
            }"#,
        )
        .unwrap();

        let output = run_to_output(MockApi::default(), config).await;
        assert_eq!(
            output,
            "AWS.SQS.QueueName_jobs.NumberOfMessagesSent 1 1700000000\n"
        );
    }

    #[tokio::test]
    async fn test_failed_query_produces_no_output_line() {
        let api = MockApi {
            load_balancers: vec!["myelb".to_string()],
            fail_namespaces: vec!["AWS/ELB".to_string()],
            ..Default::default()
        };
        let config = Config {
            elb_metrics: catalog(r#"{"Seconds": [["Latency", "Average"]]}"#),
            ..Default::default()
        };

        let output = run_to_output(api, config).await;
        assert!(output.is_empty(), "output was: {}", output);
    }

    #[tokio::test]
    async fn test_empty_query_results_produce_no_lines() {
        let api = MockApi {
            load_balancers: vec!["myelb".to_string()],
            empty_results: true,
            ..Default::default()
        };
        let config = Config {
            elb_metrics: catalog(r#"{"Seconds": [["Latency", "Average"]]}"#),
            ..Default::default()
        };

        let output = run_to_output(api, config).await;
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_formatter_applies_to_pipeline_output() {
        let api = MockApi {
            load_balancers: vec!["myelb".to_string()],
            ..Default::default()
        };
        let config = Config {
            elb_metrics: catalog(r#"{"Seconds": [["Latency", "Average"]]}"#),
            ..Default::default()
        };

        let ctx = RunContext::new(LineFormatter::new(LineFormat::Legacy, "cloudwatch"));
        let collector = Collector::new(api, config, ctx, Vec::new());
        collector.run().await;
        let output = String::from_utf8(collector.into_sink()).unwrap();

        assert_eq!(
            output,
            "cloudwatch.aws.elb.myelb.latency.average.seconds 1 1700000000\n"
        );
    }

    #[tokio::test]
    async fn test_query_count_follows_inventory_times_catalog() {
        let api = MockApi {
            load_balancers: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let config = Config {
            elb_metrics: catalog(
                r#"{"Count": [["RequestCount", "Sum"]], "Seconds": [["Latency", "Average"]]}"#,
            ),
            ..Default::default()
        };

        let output = run_to_output(api, config).await;
        // 2 load balancers x 2 catalog entries, one data point each.
        assert_eq!(output.lines().count(), 4);

        let mut dims = vec![
            Dimension::new("LoadBalancerName", "a"),
            Dimension::new("LoadBalancerName", "b"),
        ];
        dims.retain(|d| output.contains(&format!("{}_{}", d.name, d.value)));
        assert_eq!(dims.len(), 2);
    }
}
