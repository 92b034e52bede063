//! Gantry Deployment Engine
//!
//! Drives a workload from its current state to a target container image
//! using a chosen rollout strategy, enforcing health and correctness
//! guarantees along the way. The change can be promoted or reversed at any
//! point through the same executor surface.
//!
//! ## Architectural Boundaries
//!
//! - `gantry-deploy` owns: the executor state machine, the rolling /
//!   blue-green / canary strategies, traffic shifting, health verification
//! - The cluster API that creates/scales/patches workloads is the
//!   [`ClusterRuntime`] collaborator
//! - Persistence of Deployment records is the [`DeploymentStore`]
//!   collaborator; the engine saves after every mutation but defines no
//!   storage format
//! - Notification delivery is the [`Notifier`] collaborator; failures are
//!   logged and never propagated
//!
//! ## Key Principle
//!
//! The uniform wrapping - phase sequencing, event logging, timestamping,
//! persistence - lives in [`Executor`] only. Strategies implement the five
//! required steps and let errors surface; they never carry their own
//! top-level error handling.
//!
//! ## Usage
//!
//! ```no_run
//! use gantry_deploy::{Executor, InMemoryDeploymentStore, NoopNotifier};
//! use gantry_types::{Deployment, DeploymentStrategy};
//! use std::sync::Arc;
//!
//! # async fn example(runtime: Arc<dyn gantry_deploy::ClusterRuntime>) -> gantry_deploy::Result<()> {
//! let store = Arc::new(InMemoryDeploymentStore::new());
//! let notifier = Arc::new(NoopNotifier);
//!
//! let mut deployment = Deployment::new(
//!     "web", "prod", "east-1", "registry.local/web:v2", 3,
//!     DeploymentStrategy::default(),
//! );
//!
//! let executor = Executor::for_deployment(&deployment, runtime, store, notifier);
//! executor.execute(&mut deployment).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod context;
pub mod error;
pub mod executor;
pub mod notify;
pub mod runtime;
pub mod store;
pub mod strategies;

// Re-exports
pub use context::StrategyContext;
pub use error::{DeployError, Result};
pub use executor::{Executor, Strategy, VERIFICATION_FAILED};
pub use notify::{Notifier, NoopNotifier};
pub use runtime::{ClusterRuntime, PodInfo, RolloutStatus, WorkloadSpec};
pub use store::{DeploymentStore, InMemoryDeploymentStore};
pub use strategies::{BlueGreenStrategy, CanaryStrategy, RollingStrategy};
