//! Deployment record and strategy configuration
//!
//! A Deployment describes one rollout attempt. It is a plain serializable
//! value: the invoking layer reloads it from the state store before each
//! operation and the engine saves it after every mutation. Mutators here preserve the
//! record's invariants (append-only events, bounded metrics history,
//! monotone progress); everything else is driven by the executor.

use crate::events::{DeploymentEvent, EventType};
use crate::health::HealthCheckPolicy;
use crate::ids::DeploymentId;
use crate::metrics::MetricsSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Metrics snapshots retained per deployment
const METRICS_HISTORY_LIMIT: usize = 100;

/// One rollout attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique identifier
    pub id: DeploymentId,

    /// Workload name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Target cluster
    pub cluster: String,

    /// Container image being rolled out
    pub image: String,

    /// Desired replica count
    pub replicas: u32,

    /// Image running before this rollout, captured at initialize
    pub previous_image: Option<String>,

    /// Rollout strategy and its configuration
    pub strategy: DeploymentStrategy,

    /// Outward-facing lifecycle state
    pub status: DeploymentStatus,

    /// Inward-facing step cursor within a status
    pub phase: DeploymentPhase,

    /// Completion percentage (0-100)
    pub progress: u8,

    /// Traffic percentage routed to the canary (canary only)
    pub canary_weight: u8,

    /// Color currently receiving traffic (blue-green only)
    pub active_color: Option<Color>,

    /// Display message for the current status; non-empty on failure
    pub message: Option<String>,

    /// Health verification policy
    pub health_check: HealthCheckPolicy,

    /// Append-only event log
    pub events: Vec<DeploymentEvent>,

    /// Bounded metrics history (most recent last)
    pub metrics_history: Vec<MetricsSnapshot>,

    /// Record creation time
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last mutation time
    pub updated_at: chrono::DateTime<chrono::Utc>,

    /// Set when an execute operation begins
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Set when any operation exits
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Deployment {
    /// Create a fresh record in `Pending`
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        cluster: impl Into<String>,
        image: impl Into<String>,
        replicas: u32,
        strategy: DeploymentStrategy,
    ) -> Self {
        let now = chrono::Utc::now();
        let mut deployment = Self {
            id: DeploymentId::generate(),
            name: name.into(),
            namespace: namespace.into(),
            cluster: cluster.into(),
            image: image.into(),
            replicas,
            previous_image: None,
            strategy,
            status: DeploymentStatus::Pending,
            phase: DeploymentPhase::Initializing,
            progress: 0,
            canary_weight: 0,
            active_color: None,
            message: None,
            health_check: HealthCheckPolicy::default(),
            events: Vec::new(),
            metrics_history: Vec::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        deployment.record_event(EventType::Created, "deployment created");
        deployment
    }

    /// Replace the default health policy
    pub fn with_health_check(mut self, policy: HealthCheckPolicy) -> Self {
        self.health_check = policy;
        self
    }

    /// Append an event. Events are never removed or reordered.
    pub fn record_event(&mut self, event_type: EventType, message: impl Into<String>) {
        self.events.push(DeploymentEvent::now(event_type, message));
        self.updated_at = chrono::Utc::now();
    }

    /// Append an event with structured details
    pub fn record_event_with_details(
        &mut self,
        event_type: EventType,
        message: impl Into<String>,
        details: serde_json::Value,
    ) {
        self.events
            .push(DeploymentEvent::now(event_type, message).with_details(details));
        self.updated_at = chrono::Utc::now();
    }

    /// Append a metrics snapshot, discarding the oldest past the cap
    pub fn record_metrics(&mut self, snapshot: MetricsSnapshot) {
        self.metrics_history.push(snapshot);
        if self.metrics_history.len() > METRICS_HISTORY_LIMIT {
            let excess = self.metrics_history.len() - METRICS_HISTORY_LIMIT;
            self.metrics_history.drain(..excess);
        }
        self.updated_at = chrono::Utc::now();
    }

    /// Raise progress; ignores values below the current one so progress is
    /// monotone within an operation
    pub fn set_progress(&mut self, progress: u8) {
        let clamped = progress.min(100);
        if clamped > self.progress {
            self.progress = clamped;
            self.updated_at = chrono::Utc::now();
        }
    }

    /// Seconds from start to completion, or to now while in flight
    pub fn duration_seconds(&self) -> Option<i64> {
        let started = self.started_at?;
        let end = self.completed_at.unwrap_or_else(chrono::Utc::now);
        Some((end - started).num_seconds())
    }

    /// Whether an operation is in flight
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            DeploymentStatus::InProgress
                | DeploymentStatus::Paused
                | DeploymentStatus::Promoting
                | DeploymentStatus::RollingBack
        )
    }

    /// Whether the deployment reached a terminal status
    pub fn is_complete(&self) -> bool {
        matches!(
            self.status,
            DeploymentStatus::Succeeded | DeploymentStatus::Failed | DeploymentStatus::Aborted
        )
    }
}

/// Outward-facing lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    InProgress,
    Paused,
    Promoting,
    RollingBack,
    Succeeded,
    Failed,
    Aborted,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Promoting => "promoting",
            Self::RollingBack => "rolling_back",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Step cursor within an in-progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    Initializing,
    Deploying,
    Verifying,
    Promoting,
    CleaningUp,
    Completed,
    RolledBack,
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Deploying => "deploying",
            Self::Verifying => "verifying",
            Self::Promoting => "promoting",
            Self::CleaningUp => "cleaning_up",
            Self::Completed => "completed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

/// Blue-green environment color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Blue,
    Green,
}

impl Color {
    /// The other color
    pub fn complement(self) -> Self {
        match self {
            Self::Blue => Self::Green,
            Self::Green => Self::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rollout strategy selection with per-strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeploymentStrategy {
    /// In-place, incremental replacement of running instances
    Rolling(RollingConfig),

    /// Two full-size environments with an atomic traffic cutover
    BlueGreen(BlueGreenConfig),

    /// Small-traffic-share copy validated by metrics before promotion
    Canary(CanaryConfig),
}

impl DeploymentStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rolling(_) => "rolling",
            Self::BlueGreen(_) => "blue_green",
            Self::Canary(_) => "canary",
        }
    }
}

impl Default for DeploymentStrategy {
    fn default() -> Self {
        Self::Rolling(RollingConfig::default())
    }
}

/// Configuration for rolling updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Maximum extra replicas during the update
    pub max_surge: u32,

    /// Maximum replicas that may be unavailable during the update
    pub max_unavailable: u32,

    /// Overall rollout readiness deadline
    #[serde(with = "crate::duration_serde")]
    pub timeout: Duration,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            max_surge: 1,
            max_unavailable: 0,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Configuration for blue-green deployments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueGreenConfig {
    /// Routing service whose selector is flipped at cutover;
    /// defaults to the workload name when unset
    pub service: Option<String>,

    /// Rollout readiness deadline for the idle color
    #[serde(with = "crate::duration_serde")]
    pub timeout: Duration,
}

impl Default for BlueGreenConfig {
    fn default() -> Self {
        Self {
            service: None,
            timeout: Duration::from_secs(300),
        }
    }
}

/// One step of a canary schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryStep {
    /// Traffic percentage routed to the canary (0-100)
    pub weight: u8,

    /// How long to hold this weight before sampling metrics
    #[serde(with = "crate::duration_serde")]
    pub pause: Duration,
}

/// Configuration for canary deployments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryConfig {
    /// Traffic percentage applied right after the canary comes up
    pub initial_weight: u8,

    /// Weight schedule walked during verification
    pub steps: Vec<CanaryStep>,

    /// Error-rate ceiling (0.0 to 1.0); a breach aborts verification
    pub max_error_rate: f64,

    /// P95 latency ceiling in milliseconds; a breach aborts verification
    pub max_latency_p95_ms: u64,

    /// Rollout readiness deadline for the canary workload
    #[serde(with = "crate::duration_serde")]
    pub timeout: Duration,

    /// Optional service-mesh traffic-split integration; when unset, traffic
    /// is approximated by replica-count ratio
    pub mesh: Option<MeshConfig>,
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            initial_weight: 10,
            steps: vec![
                CanaryStep {
                    weight: 10,
                    pause: Duration::from_secs(60),
                },
                CanaryStep {
                    weight: 30,
                    pause: Duration::from_secs(60),
                },
                CanaryStep {
                    weight: 50,
                    pause: Duration::from_secs(60),
                },
            ],
            max_error_rate: 0.05,
            max_latency_p95_ms: 500,
            timeout: Duration::from_secs(300),
            mesh: None,
        }
    }
}

/// Service-mesh traffic-split resource written with `(100-weight, weight)`
/// route weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Resource kind, e.g. "VirtualService" or "TrafficSplit"
    pub kind: String,

    /// Resource name
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Deployment {
        Deployment::new(
            "web",
            "prod",
            "east-1",
            "registry.local/web:v2",
            3,
            DeploymentStrategy::default(),
        )
    }

    #[test]
    fn new_deployment_is_pending() {
        let d = sample();
        assert_eq!(d.status, DeploymentStatus::Pending);
        assert_eq!(d.phase, DeploymentPhase::Initializing);
        assert_eq!(d.progress, 0);
        assert_eq!(d.canary_weight, 0);
        assert!(!d.is_active());
        assert!(!d.is_complete());
        // Creation is itself the first event.
        assert_eq!(d.events.len(), 1);
    }

    #[test]
    fn events_are_append_only() {
        let mut d = sample();
        d.record_event(EventType::Info, "first");
        let before: Vec<_> = d
            .events
            .iter()
            .map(|e| (e.timestamp, e.message.clone()))
            .collect();
        d.record_event(EventType::Info, "second");
        assert_eq!(d.events.len(), before.len() + 1);
        for (event, (ts, msg)) in d.events.iter().zip(before.iter()) {
            assert_eq!(event.timestamp, *ts);
            assert_eq!(&event.message, msg);
        }
    }

    #[test]
    fn metrics_history_is_bounded() {
        let mut d = sample();
        for _ in 0..150 {
            d.record_metrics(MetricsSnapshot::empty());
        }
        assert_eq!(d.metrics_history.len(), 100);
    }

    #[test]
    fn progress_is_monotone() {
        let mut d = sample();
        d.set_progress(40);
        d.set_progress(30);
        assert_eq!(d.progress, 40);
        d.set_progress(90);
        assert_eq!(d.progress, 90);
        d.set_progress(200);
        assert_eq!(d.progress, 100);
    }

    #[test]
    fn duration_requires_start() {
        let mut d = sample();
        assert!(d.duration_seconds().is_none());
        d.started_at = Some(chrono::Utc::now() - chrono::Duration::seconds(42));
        d.completed_at = Some(d.started_at.unwrap() + chrono::Duration::seconds(10));
        assert_eq!(d.duration_seconds(), Some(10));
    }

    #[test]
    fn active_and_complete_partition_statuses() {
        let mut d = sample();
        for status in [
            DeploymentStatus::InProgress,
            DeploymentStatus::Paused,
            DeploymentStatus::Promoting,
            DeploymentStatus::RollingBack,
        ] {
            d.status = status;
            assert!(d.is_active(), "{status} should be active");
            assert!(!d.is_complete());
        }
        for status in [
            DeploymentStatus::Succeeded,
            DeploymentStatus::Failed,
            DeploymentStatus::Aborted,
        ] {
            d.status = status;
            assert!(d.is_complete(), "{status} should be complete");
            assert!(!d.is_active());
        }
    }

    #[test]
    fn color_complement() {
        assert_eq!(Color::Blue.complement(), Color::Green);
        assert_eq!(Color::Green.complement(), Color::Blue);
    }

    #[test]
    fn strategy_serializes_tagged() {
        let strategy = DeploymentStrategy::Canary(CanaryConfig::default());
        let json = serde_json::to_value(&strategy).unwrap();
        assert_eq!(json["type"], "canary");
        assert_eq!(json["initial_weight"], 10);
        assert_eq!(json["steps"][0]["pause"], 60);
        let back: DeploymentStrategy = serde_json::from_value(json).unwrap();
        assert_eq!(back.name(), "canary");
    }
}
