//! Blue-green strategy
//!
//! Maintains two parallel workload copies, `<name>-blue` and `<name>-green`.
//! The new version lands on the idle color, is verified there, and traffic
//! cuts over with a single atomic selector patch. The old color stays scaled
//! up until cleanup so rollback stays cheap.

use crate::context::StrategyContext;
use crate::error::{DeployError, Result};
use crate::executor::Strategy;
use crate::runtime::{LabelSelector, WorkloadSpec};
use async_trait::async_trait;
use gantry_types::{BlueGreenConfig, Color, Deployment, EventType};
use std::collections::BTreeMap;
use tracing::info;

/// Two full-size environments with an atomic traffic cutover
pub struct BlueGreenStrategy {
    config: BlueGreenConfig,
}

impl BlueGreenStrategy {
    pub fn new(config: BlueGreenConfig) -> Self {
        Self { config }
    }

    fn workload_name(base: &str, color: Color) -> String {
        format!("{base}-{color}")
    }

    fn color_selector(deployment: &Deployment, color: Color) -> LabelSelector {
        BTreeMap::from([
            ("app".to_string(), deployment.name.clone()),
            ("color".to_string(), color.as_str().to_string()),
        ])
    }

    fn service_name(&self, deployment: &Deployment) -> String {
        self.config
            .service
            .clone()
            .unwrap_or_else(|| deployment.name.clone())
    }

    /// Point the routing service at one color. Must be a single server-side
    /// patch so the cutover cannot race a concurrent read-modify-write.
    async fn route_to(
        &self,
        deployment: &mut Deployment,
        ctx: &StrategyContext,
        color: Color,
    ) -> Result<()> {
        let service = self.service_name(deployment);
        ctx.runtime()
            .patch(
                "Service",
                &service,
                &deployment.namespace,
                serde_json::json!({
                    "spec": {
                        "selector": {
                            "app": deployment.name,
                            "color": color.as_str(),
                        }
                    }
                }),
            )
            .await?;
        deployment.record_event_with_details(
            EventType::TrafficShift,
            format!("service {service} now routes to {color}"),
            serde_json::json!({ "service": service, "color": color.as_str() }),
        );
        Ok(())
    }
}

#[async_trait]
impl Strategy for BlueGreenStrategy {
    fn name(&self) -> &'static str {
        "blue_green"
    }

    async fn initialize(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let active = *deployment.active_color.get_or_insert(Color::Blue);
        let inactive = active.complement();
        let inactive_name = Self::workload_name(&deployment.name, inactive);

        let exists = ctx
            .runtime()
            .get_workload(&inactive_name, &deployment.namespace)
            .await?
            .is_some();
        deployment.record_event(
            EventType::Info,
            if exists {
                format!("inactive workload {inactive_name} already exists")
            } else {
                format!("inactive workload {inactive_name} will be created")
            },
        );
        Ok(())
    }

    async fn deploy(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let active = deployment.active_color.unwrap_or(Color::Blue);
        let inactive = active.complement();
        let namespace = deployment.namespace.clone();
        let active_name = Self::workload_name(&deployment.name, active);
        let inactive_name = Self::workload_name(&deployment.name, inactive);

        match ctx
            .runtime()
            .get_workload(&inactive_name, &namespace)
            .await?
        {
            Some(_) => {
                ctx.runtime()
                    .set_image(&inactive_name, &namespace, &deployment.image)
                    .await?;
            }
            None => {
                // Clone the active spec onto the idle name, swapping the
                // color label. With no active workload either (first rollout)
                // the spec is synthesized from the deployment record.
                let mut spec = match ctx
                    .runtime()
                    .get_workload(&active_name, &namespace)
                    .await?
                {
                    Some(active_spec) => active_spec,
                    None => WorkloadSpec {
                        name: String::new(),
                        namespace: namespace.clone(),
                        image: deployment.image.clone(),
                        replicas: 0,
                        labels: BTreeMap::new(),
                        selector: BTreeMap::new(),
                    },
                };
                spec.name = inactive_name.clone();
                spec.image = deployment.image.clone();
                spec.replicas = 0;
                spec.labels = Self::color_selector(deployment, inactive);
                spec.selector = Self::color_selector(deployment, inactive);
                ctx.runtime().create_workload(&spec).await?;
                deployment.record_event(
                    EventType::Info,
                    format!("created {inactive_name} from the {active} spec"),
                );
            }
        }

        ctx.runtime()
            .scale(&inactive_name, &namespace, deployment.replicas)
            .await?;

        // A failure past this point never touches the active color.
        ctx.wait_for_rollout(deployment, &inactive_name, self.config.timeout, 30, 90)
            .await
    }

    async fn verify(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<bool> {
        let inactive = deployment.active_color.unwrap_or(Color::Blue).complement();
        let selector = Self::color_selector(deployment, inactive);
        let policy = deployment.health_check.clone();
        ctx.verify_pod_health(deployment, &selector, &policy).await
    }

    async fn promote(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let active = deployment.active_color.unwrap_or(Color::Blue);
        let next = active.complement();

        self.route_to(deployment, ctx, next).await?;
        deployment.active_color = Some(next);
        info!(color = %next, "traffic cut over");
        Ok(())
    }

    async fn rollback(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let active = deployment.active_color.unwrap_or(Color::Blue);
        let other = active.complement();
        let namespace = deployment.namespace.clone();

        // Traffic goes back to whichever color is not running the rollout
        // target image; that side is still scaled up, so nothing is
        // recreated. Before a cutover that is the active color itself.
        let image_of = |spec: Option<WorkloadSpec>| spec.map(|w| w.image);
        let other_image = image_of(
            ctx.runtime()
                .get_workload(&Self::workload_name(&deployment.name, other), &namespace)
                .await?,
        );
        let target = match other_image {
            Some(image) if image != deployment.image => other,
            _ => active,
        };

        self.route_to(deployment, ctx, target).await?;
        deployment.active_color = Some(target);
        Ok(())
    }

    async fn cleanup(&self, deployment: &mut Deployment, ctx: &StrategyContext) -> Result<()> {
        let active = deployment
            .active_color
            .ok_or_else(|| DeployError::Internal("no active color after promotion".into()))?;
        let old = active.complement();
        let old_name = Self::workload_name(&deployment.name, old);

        // Scaled to zero, never deleted: the idle color is the fast-rollback
        // path for the next rollout.
        ctx.runtime()
            .scale(&old_name, &deployment.namespace, 0)
            .await?;
        deployment.record_event(
            EventType::Info,
            format!("scaled {old_name} to 0 replicas; kept for fast rollback"),
        );
        Ok(())
    }
}
