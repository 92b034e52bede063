//! Persisted-state store collaborator
//!
//! The engine saves the Deployment record after every mutation and reloads
//! it at the start of every operation; it requires only idempotent save/load
//! keyed by id and defines no storage format. Serializing concurrent
//! mutations against the same id is the caller's responsibility.

use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use gantry_types::{Deployment, DeploymentId};

/// Save/load interface for Deployment records
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Persist a record (idempotent upsert)
    async fn save(&self, deployment: &Deployment) -> Result<()>;

    /// Load a record by id
    async fn load(&self, id: &DeploymentId) -> Result<Option<Deployment>>;

    /// All records, optionally filtered by namespace
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<Deployment>>;

    /// Records with an operation in flight
    async fn list_active(&self) -> Result<Vec<Deployment>>;
}

/// In-memory store, used by tests and the CLI's dry-run path
#[derive(Default)]
pub struct InMemoryDeploymentStore {
    records: DashMap<DeploymentId, Deployment>,
}

impl InMemoryDeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeploymentStore for InMemoryDeploymentStore {
    async fn save(&self, deployment: &Deployment) -> Result<()> {
        self.records
            .insert(deployment.id.clone(), deployment.clone());
        Ok(())
    }

    async fn load(&self, id: &DeploymentId) -> Result<Option<Deployment>> {
        Ok(self.records.get(id).map(|entry| entry.clone()))
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<Deployment>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| namespace.map_or(true, |ns| entry.value().namespace == ns))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Deployment>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.value().is_active())
            .map(|entry| entry.value().clone())
            .collect())
    }
}
