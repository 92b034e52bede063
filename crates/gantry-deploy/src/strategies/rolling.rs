//! Rolling update strategy
//!
//! Updates the single workload in place and lets the scheduler replace pods
//! within the configured surge/unavailability bounds. Rollback relies on the
//! runtime's built-in previous-revision rollback.

use crate::context::StrategyContext;
use crate::error::Result;
use crate::executor::Strategy;
use crate::runtime::{LabelSelector, WorkloadSpec};
use async_trait::async_trait;
use gantry_types::{Deployment, EventType, RollingConfig};
use std::collections::BTreeMap;
use tracing::info;

/// In-place, incremental replacement of a workload's running instances
pub struct RollingStrategy {
    config: RollingConfig,
}

impl RollingStrategy {
    pub fn new(config: RollingConfig) -> Self {
        Self { config }
    }

    fn selector(deployment: &Deployment) -> LabelSelector {
        BTreeMap::from([("app".to_string(), deployment.name.clone())])
    }
}

#[async_trait]
impl Strategy for RollingStrategy {
    fn name(&self) -> &'static str {
        "rolling"
    }

    /// Rolling is already at 100% traffic after a successful execute
    fn supports_promotion(&self) -> bool {
        false
    }

    async fn initialize(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        match ctx
            .runtime()
            .get_workload(&deployment.name, &deployment.namespace)
            .await?
        {
            Some(workload) => {
                info!(previous_image = %workload.image, "captured previous image");
                deployment.record_event(
                    EventType::Info,
                    format!("captured previous image {}", workload.image),
                );
                deployment.previous_image = Some(workload.image);
            }
            None => {
                deployment.record_event(
                    EventType::Info,
                    format!("workload {} does not exist; deploying fresh", deployment.name),
                );
            }
        }
        Ok(())
    }

    async fn deploy(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let name = deployment.name.clone();
        let namespace = deployment.namespace.clone();

        match ctx.runtime().get_workload(&name, &namespace).await? {
            Some(_) => {
                // Apply the surge/unavailability bounds, then the new image.
                ctx.runtime()
                    .patch(
                        "Deployment",
                        &name,
                        &namespace,
                        serde_json::json!({
                            "spec": {
                                "strategy": {
                                    "rollingUpdate": {
                                        "maxSurge": self.config.max_surge,
                                        "maxUnavailable": self.config.max_unavailable,
                                    }
                                }
                            }
                        }),
                    )
                    .await?;
                ctx.runtime()
                    .set_image(&name, &namespace, &deployment.image)
                    .await?;
                deployment.record_event(
                    EventType::Info,
                    format!("updated image to {}", deployment.image),
                );
            }
            None => {
                let labels = Self::selector(deployment);
                ctx.runtime()
                    .create_workload(&WorkloadSpec {
                        name: name.clone(),
                        namespace: namespace.clone(),
                        image: deployment.image.clone(),
                        replicas: deployment.replicas,
                        labels: labels.clone(),
                        selector: labels,
                    })
                    .await?;
                deployment.record_event(
                    EventType::Info,
                    format!("created workload {name} with image {}", deployment.image),
                );
            }
        }

        ctx.wait_for_rollout(deployment, &name, self.config.timeout, 30, 90)
            .await
    }

    async fn verify(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<bool> {
        let selector = Self::selector(deployment);
        let policy = deployment.health_check.clone();
        ctx.verify_pod_health(deployment, &selector, &policy).await
    }

    async fn rollback(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        match &deployment.previous_image {
            Some(previous) => {
                ctx.runtime()
                    .rollback_revision(&deployment.name, &deployment.namespace)
                    .await?;
                deployment.record_event(
                    EventType::Info,
                    format!("rolled back to previous revision ({previous})"),
                );
                Ok(())
            }
            None => {
                deployment.record_event(
                    EventType::Info,
                    "no previous image recorded; nothing to roll back",
                );
                Ok(())
            }
        }
    }
}
