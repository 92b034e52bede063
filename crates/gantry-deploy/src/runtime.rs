//! Cluster runtime collaborator
//!
//! The workload runtime that actually creates, scales, and patches workloads
//! and reports pod and metric state. The engine only ever talks to it through
//! this trait; the CLI layer wires in the real cluster client.

use crate::error::Result;
use async_trait::async_trait;
use gantry_types::MetricsSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label selector used for pod listing and metric sampling
pub type LabelSelector = BTreeMap<String, String>;

/// Desired shape of a workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub replicas: u32,
    /// Labels applied to the workload and its pods
    pub labels: BTreeMap<String, String>,
    /// Pod selector
    pub selector: BTreeMap<String, String>,
}

/// Observed rollout state of a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutStatus {
    pub desired: u32,
    pub ready: u32,
    pub available: u32,
    pub updated: u32,
    /// True once every desired replica is ready and updated
    pub is_ready: bool,
}

/// Observed pod state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    /// Scheduler phase, e.g. "Running" or "Pending"
    pub phase: String,
    pub ready: bool,
    pub restarts: u32,
}

/// The cluster API the engine consumes
#[async_trait]
pub trait ClusterRuntime: Send + Sync {
    /// Fetch a workload by name, `None` if it does not exist
    async fn get_workload(&self, name: &str, namespace: &str) -> Result<Option<WorkloadSpec>>;

    /// Create a workload
    async fn create_workload(&self, spec: &WorkloadSpec) -> Result<()>;

    /// Replace a workload's spec
    async fn update_workload(&self, spec: &WorkloadSpec) -> Result<()>;

    /// Delete a workload
    async fn delete_workload(&self, name: &str, namespace: &str) -> Result<()>;

    /// Update only the container image
    async fn set_image(&self, name: &str, namespace: &str, image: &str) -> Result<()>;

    /// Scale to an absolute replica count
    async fn scale(&self, name: &str, namespace: &str, replicas: u32) -> Result<()>;

    /// Fetch rollout readiness counts
    async fn rollout_status(&self, name: &str, namespace: &str) -> Result<RolloutStatus>;

    /// List pods matching a label selector
    async fn list_pods(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<PodInfo>>;

    /// Sample health metrics for pods matching a label selector
    async fn sample_metrics(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<MetricsSnapshot>;

    /// Apply a server-side patch to an arbitrary namespaced object.
    /// Used for routing-selector flips and traffic-split resources;
    /// must be atomic, not read-modify-write.
    async fn patch(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        body: serde_json::Value,
    ) -> Result<()>;

    /// Roll a workload back to its previous revision
    async fn rollback_revision(&self, name: &str, namespace: &str) -> Result<()>;
}
