// Port for the persisted sync cursor and run-in-progress markers.
//
// Purpose
// - Survive restarts and coordinate multiple workers through compare-and-set transitions.
//
// Responsibilities
// - `try_begin` takes the run marker of every requested entity type or none of them.
// - `commit` writes cursors and releases the markers in one atomic step.

use crate::modules::catalog::core::cursor::{CursorState, EntitySyncState, RunLease};
use crate::modules::catalog::core::entity::EntityType;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

pub type SyncStateSnapshot = BTreeMap<EntityType, EntitySyncState>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("sync already running for {entity} (run {run_id})")]
    AlreadyRunning { entity: EntityType, run_id: Uuid },

    #[error("run {0} no longer holds its lease")]
    LeaseLost(Uuid),

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    /// State of every entity type; types never synced are `Fresh` and idle.
    async fn load(&self) -> Result<SyncStateSnapshot, StateError>;

    /// Takes the run marker for `entities`, ignoring markers older than `lease_ttl`.
    async fn try_begin(
        &self,
        entities: &[EntityType],
        lease: RunLease,
        lease_ttl: Duration,
    ) -> Result<SyncStateSnapshot, StateError>;

    /// Persists the advanced cursors and clears the markers held by `run_id`.
    async fn commit(
        &self,
        run_id: Uuid,
        cursors: &[(EntityType, CursorState)],
    ) -> Result<(), StateError>;

    /// Clears the markers held by `run_id` without touching cursors.
    async fn release(&self, run_id: Uuid) -> Result<(), StateError>;
}
