//! Executor contract - the deployment state machine
//!
//! A [`Strategy`] provides the five required capabilities (initialize,
//! deploy, verify, promote, rollback, cleanup); the [`Executor`] sequences
//! them uniformly, so every Deployment record carries a complete audit
//! trail regardless of which strategy ran it: every transition appends an
//! event, every mutation is persisted, every operation sets `completed_at`
//! at exit, and notification callbacks fire best-effort at status changes.
//!
//! Strategy errors are caught here and turned into a `failed` status; they
//! never escape as a crash, and nothing is retried. An `execute` failure is
//! left standing - rollback is always a separate, explicit call.

use crate::context::StrategyContext;
use crate::error::Result;
use crate::notify::Notifier;
use crate::runtime::ClusterRuntime;
use crate::store::DeploymentStore;
use crate::strategies::{BlueGreenStrategy, CanaryStrategy, RollingStrategy};
use async_trait::async_trait;
use gantry_types::{
    Deployment, DeploymentPhase, DeploymentStatus, DeploymentStrategy, EventType, MetricsSnapshot,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Fixed failure message when `verify` returns false
pub const VERIFICATION_FAILED: &str = "health check verification failed";

/// The five required capabilities of a rollout strategy
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name, for logs and events
    fn name(&self) -> &'static str;

    /// Whether `promote` does real work; strategies already at full traffic
    /// after `execute` return false and get a no-op event instead
    fn supports_promotion(&self) -> bool {
        true
    }

    /// Capture pre-rollout state (e.g. the previous image)
    async fn initialize(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()>;

    /// Drive the workload toward the target image
    async fn deploy(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()>;

    /// Decide whether the new code is healthy. A negative verdict is a
    /// result, not an error.
    async fn verify(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<bool>;

    /// Finish the cutover for strategies that stop short of full traffic
    async fn promote(&self, _deployment: &mut Deployment, _ctx: &StrategyContext) -> Result<()> {
        Ok(())
    }

    /// Reverse the change
    async fn rollback(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()>;

    /// Extra teardown for abort; defaults to the rollback step
    async fn abort(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        self.rollback(deployment, ctx).await
    }

    /// Release resources after a successful promotion
    async fn cleanup(&self, _deployment: &mut Deployment, _ctx: &StrategyContext) -> Result<()> {
        Ok(())
    }

    /// Point-in-time metrics for the rollout; strategies with real signals
    /// override this
    async fn metrics(
        &self,
        _deployment: &Deployment,
        _ctx: &StrategyContext,
    ) -> Result<MetricsSnapshot> {
        Ok(MetricsSnapshot::empty())
    }
}

/// Sequences strategy steps uniformly and owns all record bookkeeping
pub struct Executor {
    strategy: Arc<dyn Strategy>,
    ctx: StrategyContext,
    store: Arc<dyn DeploymentStore>,
    notifier: Arc<dyn Notifier>,
}

impl Executor {
    /// Build an executor with the strategy selected by the deployment record
    pub fn for_deployment(
        deployment: &Deployment,
        runtime: Arc<dyn ClusterRuntime>,
        store: Arc<dyn DeploymentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let strategy: Arc<dyn Strategy> = match &deployment.strategy {
            DeploymentStrategy::Rolling(cfg) => Arc::new(RollingStrategy::new(cfg.clone())),
            DeploymentStrategy::BlueGreen(cfg) => Arc::new(BlueGreenStrategy::new(cfg.clone())),
            DeploymentStrategy::Canary(cfg) => Arc::new(CanaryStrategy::new(cfg.clone())),
        };
        Self::new(strategy, runtime, store, notifier)
    }

    /// Build an executor around an explicit strategy
    pub fn new(
        strategy: Arc<dyn Strategy>,
        runtime: Arc<dyn ClusterRuntime>,
        store: Arc<dyn DeploymentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            strategy,
            ctx: StrategyContext::new(runtime),
            store,
            notifier,
        }
    }

    /// Run the full rollout: initialize, deploy, verify.
    ///
    /// On any error the record is marked `failed` with the error message and
    /// the operation stops; it does **not** roll back. The returned error is
    /// reserved for state-store failures - the rollout outcome is read from
    /// the record itself.
    #[instrument(skip(self, deployment), fields(deployment_id = %deployment.id, strategy = self.strategy.name()))]
    pub async fn execute(&self, deployment: &mut Deployment) -> Result<()> {
        deployment.started_at = Some(chrono::Utc::now());
        self.transition(deployment, DeploymentStatus::InProgress)
            .await?;

        let outcome = self.run_rollout_phases(deployment).await;

        match outcome {
            Ok(true) => {
                self.set_phase(deployment, DeploymentPhase::Completed).await?;
                deployment.set_progress(100);
                self.transition(deployment, DeploymentStatus::Succeeded)
                    .await?;
                info!("deployment succeeded");
            }
            Ok(false) => {
                self.fail(deployment, VERIFICATION_FAILED).await?;
            }
            Err(e) => {
                self.fail(deployment, &e.to_string()).await?;
            }
        }

        self.finish(deployment).await
    }

    /// Finish the cutover: promote, then cleanup.
    ///
    /// Strategies already at full traffic record a no-op event instead.
    #[instrument(skip(self, deployment), fields(deployment_id = %deployment.id, strategy = self.strategy.name()))]
    pub async fn promote(&self, deployment: &mut Deployment) -> Result<()> {
        if !self.strategy.supports_promotion() {
            deployment.record_event(
                EventType::Info,
                format!(
                    "promote is a no-op for the {} strategy",
                    self.strategy.name()
                ),
            );
            return self.finish(deployment).await;
        }

        self.transition(deployment, DeploymentStatus::Promoting)
            .await?;

        let outcome = self.run_promotion_phases(deployment).await;

        match outcome {
            Ok(()) => {
                self.set_phase(deployment, DeploymentPhase::Completed).await?;
                deployment.set_progress(100);
                self.transition(deployment, DeploymentStatus::Succeeded)
                    .await?;
                info!("promotion succeeded");
            }
            Err(e) => {
                self.fail(deployment, &e.to_string()).await?;
            }
        }

        self.finish(deployment).await
    }

    /// Reverse the change explicitly.
    ///
    /// A successful rollback lands on `aborted`, signalling that the
    /// attempted change did not persist; a failing rollback lands on
    /// `failed`.
    #[instrument(skip(self, deployment), fields(deployment_id = %deployment.id, strategy = self.strategy.name()))]
    pub async fn rollback(&self, deployment: &mut Deployment) -> Result<()> {
        self.run_reversal(deployment, false).await
    }

    /// Abort the rollout; delegates to the strategy's abort step, which by
    /// default is its rollback step
    #[instrument(skip(self, deployment), fields(deployment_id = %deployment.id, strategy = self.strategy.name()))]
    pub async fn abort(&self, deployment: &mut Deployment) -> Result<()> {
        self.run_reversal(deployment, true).await
    }

    /// Point-in-time metrics snapshot; never mutates the record
    pub async fn get_metrics(&self, deployment: &Deployment) -> Result<MetricsSnapshot> {
        self.strategy.metrics(deployment, &self.ctx).await
    }

    // --- Internal sequencing ---

    async fn run_rollout_phases(&self, deployment: &mut Deployment) -> Result<bool> {
        self.set_phase(deployment, DeploymentPhase::Initializing)
            .await?;
        self.strategy.initialize(deployment, &self.ctx).await?;
        deployment.set_progress(10);

        self.set_phase(deployment, DeploymentPhase::Deploying).await?;
        self.strategy.deploy(deployment, &self.ctx).await?;

        self.set_phase(deployment, DeploymentPhase::Verifying).await?;
        let verified = self.strategy.verify(deployment, &self.ctx).await?;
        if verified {
            deployment.set_progress(95);
        }
        Ok(verified)
    }

    async fn run_promotion_phases(&self, deployment: &mut Deployment) -> Result<()> {
        self.set_phase(deployment, DeploymentPhase::Promoting).await?;
        self.strategy.promote(deployment, &self.ctx).await?;
        deployment.set_progress(90);

        self.set_phase(deployment, DeploymentPhase::CleaningUp)
            .await?;
        self.strategy.cleanup(deployment, &self.ctx).await
    }

    async fn run_reversal(&self, deployment: &mut Deployment, abort: bool) -> Result<()> {
        self.transition(deployment, DeploymentStatus::RollingBack)
            .await?;

        let outcome = if abort {
            self.strategy.abort(deployment, &self.ctx).await
        } else {
            self.strategy.rollback(deployment, &self.ctx).await
        };

        match outcome {
            Ok(()) => {
                self.set_phase(deployment, DeploymentPhase::RolledBack)
                    .await?;
                self.transition(deployment, DeploymentStatus::Aborted)
                    .await?;
                info!("rollback complete");
            }
            Err(e) => {
                self.fail(deployment, &format!("Rollback failed: {e}")).await?;
            }
        }

        self.finish(deployment).await
    }

    // --- Record bookkeeping ---

    async fn set_phase(&self, deployment: &mut Deployment, phase: DeploymentPhase) -> Result<()> {
        deployment.phase = phase;
        deployment.record_event(EventType::PhaseChanged, format!("entered phase {phase}"));
        self.store.save(deployment).await
    }

    async fn transition(&self, deployment: &mut Deployment, status: DeploymentStatus) -> Result<()> {
        deployment.status = status;
        deployment.record_event(EventType::StatusChanged, format!("status changed to {status}"));
        self.store.save(deployment).await?;

        let note = format!("deployment {} is {status}", deployment.id);
        if let Err(e) = self.notifier.notify(deployment, &note).await {
            warn!(error = %e, "notification delivery failed");
        }
        Ok(())
    }

    async fn fail(&self, deployment: &mut Deployment, message: &str) -> Result<()> {
        error!(message, "deployment failed");
        deployment.message = Some(message.to_string());
        deployment.record_event(EventType::Error, message);
        self.transition(deployment, DeploymentStatus::Failed).await
    }

    async fn finish(&self, deployment: &mut Deployment) -> Result<()> {
        deployment.completed_at = Some(chrono::Utc::now());
        self.store.save(deployment).await
    }
}
