//! Canary strategy
//!
//! Runs a secondary low-replica copy of the new image next to the stable
//! workload, shifts a traffic-weight percentage to it along a step schedule,
//! and samples metrics after each step against error-rate and latency
//! thresholds. Promotion updates the primary to the canary image and removes
//! the canary; rollback restores zero canary traffic and deletes it.

use crate::context::StrategyContext;
use crate::error::{DeployError, Result};
use crate::executor::Strategy;
use crate::runtime::{LabelSelector, WorkloadSpec};
use async_trait::async_trait;
use gantry_types::{CanaryConfig, Deployment, EventType, MetricsSnapshot};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Replica counts for a traffic weight when no mesh is configured.
///
/// Traffic is approximated by replica ratio: the canary gets
/// `max(1, round(total * weight / 100))` replicas and the stable side keeps
/// `max(1, total - canary)`, with the 0% and 100% boundaries handled exactly.
/// A zero-replica workload has nothing to split.
pub fn split_replicas(total: u32, weight: u8) -> (u32, u32) {
    if total == 0 {
        return (0, 0);
    }
    match weight {
        0 => (0, total),
        100 => (total, 0),
        w => {
            let canary = ((total as f64) * (w as f64) / 100.0).round() as u32;
            let canary = canary.clamp(1, total);
            let stable = (total - canary).max(1);
            (canary, stable)
        }
    }
}

/// Small-traffic-share copy validated by metrics before full rollout
pub struct CanaryStrategy {
    config: CanaryConfig,
}

impl CanaryStrategy {
    pub fn new(config: CanaryConfig) -> Self {
        Self { config }
    }

    fn canary_name(deployment: &Deployment) -> String {
        format!("{}-canary", deployment.name)
    }

    fn canary_selector(deployment: &Deployment) -> LabelSelector {
        BTreeMap::from([
            ("app".to_string(), deployment.name.clone()),
            ("track".to_string(), "canary".to_string()),
        ])
    }

    /// Route `weight` percent of traffic to the canary: either one atomic
    /// patch of the mesh traffic-split resource, or a replica-ratio
    /// approximation by scaling both workloads.
    async fn apply_weight(
        &self,
        deployment: &mut Deployment,
        ctx: &StrategyContext,
        weight: u8,
    ) -> Result<()> {
        let namespace = deployment.namespace.clone();
        let canary_name = Self::canary_name(deployment);

        match &self.config.mesh {
            Some(mesh) => {
                ctx.runtime()
                    .patch(
                        &mesh.kind,
                        &mesh.name,
                        &namespace,
                        serde_json::json!({
                            "spec": {
                                "routes": [
                                    { "destination": deployment.name, "weight": 100 - weight },
                                    { "destination": canary_name, "weight": weight },
                                ]
                            }
                        }),
                    )
                    .await?;
            }
            None => {
                let (canary, stable) = split_replicas(deployment.replicas, weight);
                ctx.runtime().scale(&canary_name, &namespace, canary).await?;
                ctx.runtime()
                    .scale(&deployment.name, &namespace, stable)
                    .await?;
            }
        }

        deployment.canary_weight = weight;
        deployment.record_event_with_details(
            EventType::TrafficShift,
            format!("canary traffic weight set to {weight}%"),
            serde_json::json!({ "weight": weight }),
        );
        Ok(())
    }
}

#[async_trait]
impl Strategy for CanaryStrategy {
    fn name(&self) -> &'static str {
        "canary"
    }

    async fn initialize(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        // A canary is a comparison against a baseline; without one there is
        // nothing to compare.
        let baseline = ctx
            .runtime()
            .get_workload(&deployment.name, &deployment.namespace)
            .await?
            .ok_or_else(|| DeployError::MissingBaseline(deployment.name.clone()))?;

        deployment.record_event(
            EventType::Info,
            format!("baseline image {}", baseline.image),
        );
        deployment.previous_image = Some(baseline.image);
        Ok(())
    }

    async fn deploy(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let namespace = deployment.namespace.clone();
        let canary_name = Self::canary_name(deployment);
        let initial = self.config.initial_weight;
        let (replicas, _) = split_replicas(deployment.replicas, initial);
        let replicas = replicas.max(1);

        match ctx.runtime().get_workload(&canary_name, &namespace).await? {
            Some(_) => {
                ctx.runtime()
                    .set_image(&canary_name, &namespace, &deployment.image)
                    .await?;
            }
            None => {
                let labels = Self::canary_selector(deployment);
                ctx.runtime()
                    .create_workload(&WorkloadSpec {
                        name: canary_name.clone(),
                        namespace: namespace.clone(),
                        image: deployment.image.clone(),
                        replicas,
                        labels: labels.clone(),
                        selector: labels,
                    })
                    .await?;
                deployment.record_event(
                    EventType::Info,
                    format!("created canary workload {canary_name} with {replicas} replicas"),
                );
            }
        }

        ctx.wait_for_rollout(deployment, &canary_name, self.config.timeout, 30, 60)
            .await?;

        self.apply_weight(deployment, ctx, initial).await
    }

    async fn verify(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<bool> {
        let namespace = deployment.namespace.clone();
        let selector = Self::canary_selector(deployment);

        for step in &self.config.steps {
            self.apply_weight(deployment, ctx, step.weight).await?;
            tokio::time::sleep(step.pause).await;

            let snapshot = ctx.runtime().sample_metrics(&namespace, &selector).await?;
            deployment.record_metrics(snapshot.clone());
            deployment.record_event_with_details(
                EventType::MetricsSample,
                format!("sampled canary metrics at {}% traffic", step.weight),
                serde_json::json!({
                    "weight": step.weight,
                    "error_rate": snapshot.error_rate,
                    "latency_p95_ms": snapshot.latency_p95_ms,
                }),
            );

            if snapshot.error_rate > self.config.max_error_rate {
                warn!(
                    weight = step.weight,
                    error_rate = snapshot.error_rate,
                    threshold = self.config.max_error_rate,
                    "canary error rate breached threshold"
                );
                deployment.record_event_with_details(
                    EventType::Error,
                    format!(
                        "error rate {:.4} breached threshold {:.4} at {}% traffic",
                        snapshot.error_rate, self.config.max_error_rate, step.weight
                    ),
                    serde_json::json!({
                        "error_rate": snapshot.error_rate,
                        "threshold": self.config.max_error_rate,
                        "weight": step.weight,
                    }),
                );
                return Ok(false);
            }

            if snapshot.latency_p95_ms > self.config.max_latency_p95_ms {
                warn!(
                    weight = step.weight,
                    latency_p95_ms = snapshot.latency_p95_ms,
                    threshold = self.config.max_latency_p95_ms,
                    "canary p95 latency breached threshold"
                );
                deployment.record_event_with_details(
                    EventType::Error,
                    format!(
                        "p95 latency {}ms breached threshold {}ms at {}% traffic",
                        snapshot.latency_p95_ms, self.config.max_latency_p95_ms, step.weight
                    ),
                    serde_json::json!({
                        "latency_p95_ms": snapshot.latency_p95_ms,
                        "threshold_ms": self.config.max_latency_p95_ms,
                        "weight": step.weight,
                    }),
                );
                return Ok(false);
            }

            deployment.record_event(
                EventType::Progress,
                format!("canary step at {}% traffic passed", step.weight),
            );
        }

        Ok(true)
    }

    async fn promote(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let namespace = deployment.namespace.clone();
        let name = deployment.name.clone();

        ctx.runtime()
            .set_image(&name, &namespace, &deployment.image)
            .await?;
        ctx.wait_for_rollout(deployment, &name, self.config.timeout, 50, 85)
            .await?;

        // All traffic is now served by the updated primary.
        self.apply_weight(deployment, ctx, 0).await?;
        deployment.record_event(
            EventType::Info,
            format!("primary {name} promoted to {}", deployment.image),
        );
        info!(workload = %name, "canary promoted");
        Ok(())
    }

    async fn rollback(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let namespace = deployment.namespace.clone();
        let canary_name = Self::canary_name(deployment);

        match ctx
            .runtime()
            .get_workload(&canary_name, &namespace)
            .await?
        {
            Some(_) => {
                self.apply_weight(deployment, ctx, 0).await?;
                ctx.runtime().delete_workload(&canary_name, &namespace).await?;
                deployment.record_event(
                    EventType::Info,
                    format!("deleted canary workload {canary_name}; baseline restored"),
                );
            }
            None => {
                deployment.canary_weight = 0;
                deployment.record_event(
                    EventType::Info,
                    format!("canary workload {canary_name} does not exist; nothing to remove"),
                );
            }
        }
        Ok(())
    }

    async fn cleanup(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let canary_name = Self::canary_name(deployment);
        ctx.runtime()
            .delete_workload(&canary_name, &deployment.namespace)
            .await?;
        deployment.record_event(
            EventType::Info,
            format!("deleted canary workload {canary_name} after promotion"),
        );
        Ok(())
    }

    async fn metrics(
        &self,
        deployment: &Deployment,
        ctx: &StrategyContext,
    ) -> Result<MetricsSnapshot> {
        ctx.runtime()
            .sample_metrics(&deployment.namespace, &Self::canary_selector(deployment))
            .await
    }
}
