//! Discovered resource identifiers and their dimension rules
//!
//! Each supported resource type is one variant of a closed enum; the variant
//! carries everything the catalog expander needs (namespace plus the ordered
//! dimension set). Adding a resource type means adding a variant here and
//! wiring a pipeline for it, not scattering conditionals.

use crate::model::Dimension;

/// Identifier of one discovered resource, produced once per run by discovery
/// and consumed immediately by catalog expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceId {
    /// Classic load balancer, by name.
    LoadBalancer(String),
    /// Relational database instance, by identifier.
    DbInstance(String),
    /// In-memory cache node, addressed by cluster and node id.
    CacheNode { cluster: String, node: String },
    /// Container cluster, by display name.
    EcsCluster(String),
    /// Container service, addressed by cluster and service display names.
    EcsService { cluster: String, service: String },
    /// Serverless function, by name.
    Function(String),
}

impl ResourceId {
    /// CloudWatch namespace of this resource type's metrics.
    pub fn namespace(&self) -> &'static str {
        match self {
            ResourceId::LoadBalancer(_) => "AWS/ELB",
            ResourceId::DbInstance(_) => "AWS/RDS",
            ResourceId::CacheNode { .. } => "AWS/ElastiCache",
            ResourceId::EcsCluster(_) | ResourceId::EcsService { .. } => "AWS/ECS",
            ResourceId::Function(_) => "AWS/Lambda",
        }
    }

    /// The ordered dimension set required by this resource type's namespace.
    /// The rules are fixed per type, not configurable.
    pub fn dimensions(&self) -> Vec<Dimension> {
        match self {
            ResourceId::LoadBalancer(name) => {
                vec![Dimension::new("LoadBalancerName", name.clone())]
            }
            ResourceId::DbInstance(id) => {
                vec![Dimension::new("DBInstanceIdentifier", id.clone())]
            }
            ResourceId::CacheNode { cluster, node } => vec![
                Dimension::new("CacheClusterId", cluster.clone()),
                Dimension::new("CacheNodeId", node.clone()),
            ],
            ResourceId::EcsCluster(name) => {
                vec![Dimension::new("ClusterName", name.clone())]
            }
            ResourceId::EcsService { cluster, service } => vec![
                Dimension::new("ClusterName", cluster.clone()),
                Dimension::new("ServiceName", service.clone()),
            ],
            ResourceId::Function(name) => {
                vec![Dimension::new("FunctionName", name.clone())]
            }
        }
    }
}

/// Turn raw cache-cluster inventory (cluster id plus its node ids) into
/// resource identifiers.
///
/// Only the first node of each cluster is queried, matching long-standing
/// collector behavior; a cluster that currently reports no nodes yields no
/// identifier at all.
pub fn cache_nodes_from(clusters: Vec<(String, Vec<String>)>) -> Vec<ResourceId> {
    clusters
        .into_iter()
        .filter_map(|(cluster, nodes)| {
            let node = nodes.into_iter().next()?;
            Some(ResourceId::CacheNode { cluster, node })
        })
        .collect()
}
