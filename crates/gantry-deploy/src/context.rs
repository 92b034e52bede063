//! Strategy context - shared execution environment for strategies
//!
//! Bridges strategies to the cluster runtime and carries the wait loops
//! every strategy needs: rollout readiness polling with progress mapping,
//! and threshold-based pod health verification.

use crate::error::{DeployError, Result};
use crate::runtime::{ClusterRuntime, LabelSelector};
use gantry_types::{Deployment, EventType, HealthCheckPolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval between rollout status polls
const ROLLOUT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Context handed to every strategy step
pub struct StrategyContext {
    runtime: Arc<dyn ClusterRuntime>,
}

impl StrategyContext {
    pub fn new(runtime: Arc<dyn ClusterRuntime>) -> Self {
        Self { runtime }
    }

    /// The cluster runtime collaborator
    pub fn runtime(&self) -> &dyn ClusterRuntime {
        self.runtime.as_ref()
    }

    /// Poll a workload's rollout until every desired replica is ready.
    ///
    /// Progress is mapped linearly from `progress_from` to `progress_to`
    /// based on the ready/desired ratio. Exceeding `timeout` raises
    /// [`DeployError::Timeout`].
    pub async fn wait_for_rollout(
        &self,
        deployment: &mut Deployment,
        name: &str,
        timeout: Duration,
        progress_from: u8,
        progress_to: u8,
    ) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let namespace = deployment.namespace.clone();

        loop {
            let status = self.runtime.rollout_status(name, &namespace).await?;

            if status.desired > 0 {
                let span = progress_to.saturating_sub(progress_from) as u32;
                let ready = status.ready.min(status.desired);
                let progress = progress_from as u32 + span * ready / status.desired;
                deployment.set_progress(progress as u8);
            }

            debug!(
                workload = name,
                ready = status.ready,
                desired = status.desired,
                "rollout status"
            );

            if status.is_ready {
                deployment.record_event(
                    EventType::Progress,
                    format!("rollout of {name} complete ({}/{} ready)", status.ready, status.desired),
                );
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                warn!(workload = name, "rollout did not become ready in time");
                return Err(DeployError::Timeout {
                    operation: format!("rollout of {name}"),
                });
            }

            tokio::time::sleep(ROLLOUT_POLL_INTERVAL).await;
        }
    }

    /// Verify pod health against the deployment's policy.
    ///
    /// Requires `success_threshold` consecutive healthy polls; any unhealthy
    /// poll resets the counter. Gives up (returns `Ok(false)`) after
    /// `success_threshold + failure_threshold` total polls. A disabled
    /// policy passes immediately.
    pub async fn verify_pod_health(
        &self,
        deployment: &mut Deployment,
        selector: &LabelSelector,
        policy: &HealthCheckPolicy,
    ) -> Result<bool> {
        if !policy.enabled {
            deployment.record_event(
                EventType::HealthCheck,
                "health checks disabled; skipping verification",
            );
            return Ok(true);
        }

        tokio::time::sleep(policy.initial_delay).await;

        let namespace = deployment.namespace.clone();
        let mut consecutive = 0u32;

        for poll in 1..=policy.max_polls() {
            let healthy = match tokio::time::timeout(
                policy.timeout,
                self.runtime.list_pods(&namespace, selector),
            )
            .await
            {
                Ok(pods) => {
                    let pods = pods?;
                    !pods.is_empty() && pods.iter().all(|p| p.ready)
                }
                // An elapsed probe counts as an unhealthy poll.
                Err(_) => false,
            };

            if healthy {
                consecutive += 1;
                debug!(poll, consecutive, "healthy poll");
                if consecutive >= policy.success_threshold {
                    deployment.record_event(
                        EventType::HealthCheck,
                        format!("{consecutive} consecutive healthy polls; verification passed"),
                    );
                    return Ok(true);
                }
            } else {
                if consecutive > 0 {
                    info!(poll, "unhealthy poll; resetting consecutive counter");
                }
                consecutive = 0;
                deployment.record_event(
                    EventType::HealthCheck,
                    format!("unhealthy poll {poll}/{}", policy.max_polls()),
                );
            }

            tokio::time::sleep(policy.poll_interval).await;
        }

        deployment.record_event(
            EventType::HealthCheck,
            format!(
                "gave up after {} polls without {} consecutive successes",
                policy.max_polls(),
                policy.success_threshold
            ),
        );
        Ok(false)
    }
}
