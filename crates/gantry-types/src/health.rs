//! Health check policy
//!
//! A small value type consumed by every strategy to decide whether the new
//! code is healthy. Immutable once attached to a Deployment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds and timing for health verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckPolicy {
    /// Whether health verification runs at all
    pub enabled: bool,

    /// HTTP endpoint probed on each pod
    pub endpoint: String,

    /// Port the endpoint listens on
    pub port: u16,

    /// Delay before the first poll
    #[serde(with = "crate::duration_serde")]
    pub initial_delay: Duration,

    /// Interval between polls
    #[serde(with = "crate::duration_serde")]
    pub poll_interval: Duration,

    /// Per-probe timeout; an elapsed probe counts as an unhealthy poll
    #[serde(with = "crate::duration_serde")]
    pub timeout: Duration,

    /// Consecutive healthy polls required to pass
    pub success_threshold: u32,

    /// Unhealthy polls tolerated before giving up
    pub failure_threshold: u32,
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/healthz".to_string(),
            port: 8080,
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            success_threshold: 3,
            failure_threshold: 3,
        }
    }
}

impl HealthCheckPolicy {
    /// A disabled policy (verification passes immediately)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Total polls allowed before verification gives up
    pub fn max_polls(&self) -> u32 {
        self.success_threshold + self.failure_threshold
    }
}
