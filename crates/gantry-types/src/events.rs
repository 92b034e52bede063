//! Deployment event log types
//!
//! Events form an append-only audit trail on each Deployment record.

use serde::{Deserialize, Serialize};

/// A single timestamped entry in a deployment's event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEvent {
    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event category
    pub event_type: EventType,

    /// Human-readable message
    pub message: String,

    /// Structured details (null when there are none)
    #[serde(default)]
    pub details: serde_json::Value,
}

impl DeploymentEvent {
    /// Create an event stamped with the current time
    pub fn now(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    /// Attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Severity implied by the event category
    pub fn severity(&self) -> EventSeverity {
        match self.event_type {
            EventType::Error => EventSeverity::Error,
            EventType::HealthCheck | EventType::TrafficShift => EventSeverity::Warning,
            _ => EventSeverity::Info,
        }
    }
}

/// Event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Deployment record created
    Created,
    /// Phase cursor moved
    PhaseChanged,
    /// Lifecycle status changed
    StatusChanged,
    /// Progress update
    Progress,
    /// Health verification activity
    HealthCheck,
    /// Traffic weight or routing selector change
    TrafficShift,
    /// Metrics sampled
    MetricsSample,
    /// An operation failed
    Error,
    /// Informational
    Info,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}
