//! Engine error types

use thiserror::Error;

/// Errors surfaced by deployment operations
#[derive(Debug, Error)]
pub enum DeployError {
    /// The cluster runtime rejected or failed an operation
    #[error("cluster runtime error: {0}")]
    Runtime(String),

    /// A wait loop exceeded its deadline
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// The state store failed to save or load a record
    #[error("state store error: {0}")]
    StateStore(String),

    /// A workload the operation needs does not exist
    #[error("workload not found: {0}")]
    WorkloadNotFound(String),

    /// The strategy requires a baseline that is missing
    #[error("no baseline workload for {0}; nothing to compare the canary against")]
    MissingBaseline(String),

    /// Anything else
    #[error("{0}")]
    Internal(String),
}

/// Engine result alias
pub type Result<T> = std::result::Result<T, DeployError>;
