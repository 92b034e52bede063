//! Notification collaborator
//!
//! Invoked at status-changing points. Delivery is best-effort: the executor
//! logs failures and never propagates them.

use async_trait::async_trait;
use gantry_types::Deployment;

/// Callback for status-change notifications (chat, paging)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message about a deployment. Errors are reported as strings;
    /// the engine logs and swallows them.
    async fn notify(&self, deployment: &Deployment, message: &str) -> Result<(), String>;
}

/// Discards all notifications
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _deployment: &Deployment, _message: &str) -> Result<(), String> {
        Ok(())
    }
}
