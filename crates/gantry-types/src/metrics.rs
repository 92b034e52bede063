//! Metrics snapshot types

use serde::{Deserialize, Serialize};

/// A point-in-time sample of workload health signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Sample timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Fraction of requests succeeding (0.0 to 1.0)
    pub success_rate: f64,

    /// Fraction of requests failing (0.0 to 1.0)
    pub error_rate: f64,

    /// Median request latency in milliseconds
    pub latency_p50_ms: u64,

    /// 95th percentile latency in milliseconds
    pub latency_p95_ms: u64,

    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: u64,

    /// Requests per second
    pub throughput_rps: f64,

    /// CPU usage as a fraction of requested (0.0 to 1.0)
    pub cpu_usage: f64,

    /// Memory usage in MiB
    pub memory_usage_mb: f64,
}

impl MetricsSnapshot {
    /// A zeroed snapshot stamped with the current time
    pub fn empty() -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            success_rate: 0.0,
            error_rate: 0.0,
            latency_p50_ms: 0,
            latency_p95_ms: 0,
            latency_p99_ms: 0,
            throughput_rps: 0.0,
            cpu_usage: 0.0,
            memory_usage_mb: 0.0,
        }
    }
}
