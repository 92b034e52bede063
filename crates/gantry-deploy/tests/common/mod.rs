#![allow(dead_code)]

//! Shared test fixtures: a scripted fake cluster runtime and an executor
//! harness wired to the in-memory store.

use async_trait::async_trait;
use gantry_deploy::{
    ClusterRuntime, DeployError, Executor, InMemoryDeploymentStore, NoopNotifier, PodInfo, Result,
    RolloutStatus, WorkloadSpec,
};
use gantry_types::{Deployment, HealthCheckPolicy, MetricsSnapshot};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted cluster runtime. State mutations are recorded in a call log so
/// tests can assert which operations ran (and which did not).
#[derive(Default)]
pub struct FakeRuntime {
    pub workloads: Mutex<BTreeMap<String, WorkloadSpec>>,
    /// Per-workload count of not-ready polls before the rollout reports ready
    pub rollout_delays: Mutex<HashMap<String, u32>>,
    /// Workloads whose rollout never becomes ready
    pub never_ready: Mutex<HashSet<String>>,
    /// Scripted pod readiness polls, front first; healthy once exhausted
    pub pod_polls: Mutex<VecDeque<bool>>,
    /// Scripted metric samples, front first; a zeroed snapshot once exhausted
    pub metric_samples: Mutex<VecDeque<MetricsSnapshot>>,
    /// Operation names that fail with an injected runtime error
    pub fail_ops: Mutex<HashSet<&'static str>>,
    /// One line per mutating runtime call
    pub calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install a workload as pre-existing cluster state
    pub fn seed_workload(&self, name: &str, image: &str, replicas: u32) {
        let labels = BTreeMap::from([("app".to_string(), name.to_string())]);
        self.workloads.lock().unwrap().insert(
            name.to_string(),
            WorkloadSpec {
                name: name.to_string(),
                namespace: "prod".to_string(),
                image: image.to_string(),
                replicas,
                labels: labels.clone(),
                selector: labels,
            },
        );
    }

    pub fn fail_on(&self, op: &'static str) {
        self.fail_ops.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.fail_ops.lock().unwrap().clear();
    }

    pub fn script_pod_polls(&self, polls: &[bool]) {
        self.pod_polls.lock().unwrap().extend(polls.iter().copied());
    }

    pub fn script_metrics(&self, samples: Vec<MetricsSnapshot>) {
        self.metric_samples.lock().unwrap().extend(samples);
    }

    pub fn remaining_metric_samples(&self) -> usize {
        self.metric_samples.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether any recorded call starts with `prefix`
    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn workload(&self, name: &str) -> Option<WorkloadSpec> {
        self.workloads.lock().unwrap().get(name).cloned()
    }

    fn check_fail(&self, op: &'static str) -> Result<()> {
        if self.fail_ops.lock().unwrap().contains(op) {
            return Err(DeployError::Runtime(format!("injected {op} failure")));
        }
        Ok(())
    }

    fn log(&self, line: String) {
        self.calls.lock().unwrap().push(line);
    }
}

#[async_trait]
impl ClusterRuntime for FakeRuntime {
    async fn get_workload(&self, name: &str, _namespace: &str) -> Result<Option<WorkloadSpec>> {
        self.check_fail("get_workload")?;
        Ok(self.workloads.lock().unwrap().get(name).cloned())
    }

    async fn create_workload(&self, spec: &WorkloadSpec) -> Result<()> {
        self.check_fail("create_workload")?;
        self.log(format!("create_workload {}", spec.name));
        self.workloads
            .lock()
            .unwrap()
            .insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn update_workload(&self, spec: &WorkloadSpec) -> Result<()> {
        self.check_fail("update_workload")?;
        self.log(format!("update_workload {}", spec.name));
        self.workloads
            .lock()
            .unwrap()
            .insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn delete_workload(&self, name: &str, _namespace: &str) -> Result<()> {
        self.check_fail("delete_workload")?;
        self.log(format!("delete_workload {name}"));
        self.workloads.lock().unwrap().remove(name);
        Ok(())
    }

    async fn set_image(&self, name: &str, _namespace: &str, image: &str) -> Result<()> {
        self.check_fail("set_image")?;
        self.log(format!("set_image {name} {image}"));
        match self.workloads.lock().unwrap().get_mut(name) {
            Some(w) => {
                w.image = image.to_string();
                Ok(())
            }
            None => Err(DeployError::WorkloadNotFound(name.to_string())),
        }
    }

    async fn scale(&self, name: &str, _namespace: &str, replicas: u32) -> Result<()> {
        self.check_fail("scale")?;
        self.log(format!("scale {name} {replicas}"));
        match self.workloads.lock().unwrap().get_mut(name) {
            Some(w) => {
                w.replicas = replicas;
                Ok(())
            }
            None => Err(DeployError::WorkloadNotFound(name.to_string())),
        }
    }

    async fn rollout_status(&self, name: &str, _namespace: &str) -> Result<RolloutStatus> {
        self.check_fail("rollout_status")?;
        let desired = self
            .workloads
            .lock()
            .unwrap()
            .get(name)
            .map(|w| w.replicas)
            .ok_or_else(|| DeployError::WorkloadNotFound(name.to_string()))?;

        if self.never_ready.lock().unwrap().contains(name) {
            return Ok(RolloutStatus {
                desired,
                ready: 0,
                available: 0,
                updated: desired,
                is_ready: false,
            });
        }

        let mut delays = self.rollout_delays.lock().unwrap();
        if let Some(remaining) = delays.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(RolloutStatus {
                    desired,
                    ready: desired / 2,
                    available: desired / 2,
                    updated: desired,
                    is_ready: false,
                });
            }
        }

        Ok(RolloutStatus {
            desired,
            ready: desired,
            available: desired,
            updated: desired,
            is_ready: true,
        })
    }

    async fn list_pods(
        &self,
        _namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<PodInfo>> {
        self.check_fail("list_pods")?;
        let ready = self.pod_polls.lock().unwrap().pop_front().unwrap_or(true);
        let app = selector.get("app").cloned().unwrap_or_default();
        Ok((0..2)
            .map(|i| PodInfo {
                name: format!("{app}-{i}"),
                phase: "Running".to_string(),
                ready,
                restarts: 0,
            })
            .collect())
    }

    async fn sample_metrics(
        &self,
        _namespace: &str,
        _selector: &BTreeMap<String, String>,
    ) -> Result<MetricsSnapshot> {
        self.check_fail("sample_metrics")?;
        Ok(self
            .metric_samples
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(MetricsSnapshot::empty))
    }

    async fn patch(
        &self,
        kind: &str,
        name: &str,
        _namespace: &str,
        body: serde_json::Value,
    ) -> Result<()> {
        self.check_fail("patch")?;
        self.log(format!("patch {kind} {name} {body}"));
        Ok(())
    }

    async fn rollback_revision(&self, name: &str, _namespace: &str) -> Result<()> {
        self.check_fail("rollback_revision")?;
        self.log(format!("rollback_revision {name}"));
        Ok(())
    }
}

/// Executor plus the collaborators it was built with
pub struct Harness {
    pub runtime: Arc<FakeRuntime>,
    pub store: Arc<InMemoryDeploymentStore>,
    pub executor: Executor,
}

pub fn harness(deployment: &Deployment) -> Harness {
    harness_with(deployment, FakeRuntime::new())
}

pub fn harness_with(deployment: &Deployment, runtime: Arc<FakeRuntime>) -> Harness {
    let store = Arc::new(InMemoryDeploymentStore::new());
    let executor = Executor::for_deployment(
        deployment,
        runtime.clone(),
        store.clone(),
        Arc::new(NoopNotifier),
    );
    Harness {
        runtime,
        store,
        executor,
    }
}

/// A health policy with low thresholds so tests need few polls
pub fn fast_health_policy() -> HealthCheckPolicy {
    HealthCheckPolicy {
        initial_delay: Duration::from_secs(1),
        poll_interval: Duration::from_secs(1),
        timeout: Duration::from_secs(1),
        success_threshold: 2,
        failure_threshold: 1,
        ..HealthCheckPolicy::default()
    }
}
