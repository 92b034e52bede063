//! Gantry Types - Core types for the deployment engine
//!
//! Gantry drives a workload from its current state to a new container image
//! using a chosen rollout strategy. This crate holds the persisted data model
//! shared between the engine and the CLI layer.
//!
//! ## Architectural Boundaries
//!
//! - **gantry-types** owns: the Deployment record, strategy configuration,
//!   health-check policy, events, metrics snapshots
//! - **gantry-deploy** owns: the executor state machine and the strategy
//!   implementations that mutate these records
//! - The cluster API, the persisted-state store, and notification delivery
//!   are collaborators behind traits in `gantry-deploy`
//!
//! ## Key Concepts
//!
//! - **Deployment**: one rollout attempt - identity, target image, strategy,
//!   status/phase, progress, event log, metrics history
//! - **Status vs. Phase**: status is the coarse lifecycle state shown to
//!   callers; phase is the step cursor within an in-progress status
//! - **HealthCheckPolicy**: thresholds and timing governing how "healthy" is
//!   determined from repeated probes

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod deployment;
pub mod events;
pub mod health;
pub mod ids;
pub mod metrics;

// Re-export main types
pub use deployment::{
    BlueGreenConfig, CanaryConfig, CanaryStep, Color, Deployment, DeploymentPhase,
    DeploymentStatus, DeploymentStrategy, MeshConfig, RollingConfig,
};
pub use events::{DeploymentEvent, EventSeverity, EventType};
pub use health::HealthCheckPolicy;
pub use ids::DeploymentId;
pub use metrics::MetricsSnapshot;

/// Serde helper for `std::time::Duration`, stored as whole seconds.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
