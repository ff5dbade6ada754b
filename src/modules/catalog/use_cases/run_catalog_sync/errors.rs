use crate::modules::catalog::adapters::outbound::catalog_source::SourceError;
use crate::modules::catalog::adapters::outbound::catalog_store::StoreError;
use crate::modules::catalog::adapters::outbound::sync_state::StateError;
use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::summary::{FailureKind, SyncFailure};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(
        "fetching {entity} failed after {attempts} attempt(s) at page {}: {reason}",
        .page_token.as_deref().unwrap_or("<first>")
    )]
    FetchFailed {
        entity: EntityType,
        /// Token of the page that could not be fetched; resume from here.
        page_token: Option<String>,
        attempts: u32,
        reason: SourceError,
    },

    #[error("writing {entity} failed at {}: {source}", .page.map(|p| format!("page {p}")).unwrap_or_else(|| "archive step".into()))]
    UpsertFailed {
        entity: EntityType,
        /// 1-based page number within the stage; `None` for the archive step.
        page: Option<u64>,
        page_token: Option<String>,
        #[source]
        source: StoreError,
    },

    #[error("sync already running for {entity} (run {run_id})")]
    SyncAlreadyRunning { entity: EntityType, run_id: Uuid },

    #[error("sync state store failed: {0}")]
    StateStore(StateError),
}

impl From<StateError> for SyncError {
    fn from(error: StateError) -> Self {
        match error {
            StateError::AlreadyRunning { entity, run_id } => {
                SyncError::SyncAlreadyRunning { entity, run_id }
            }
            other => SyncError::StateStore(other),
        }
    }
}

impl SyncError {
    /// Failure record for a run summary, or `None` for errors that abort before a run exists.
    pub fn to_failure(&self, pages_done: u64) -> Option<SyncFailure> {
        match self {
            SyncError::FetchFailed {
                entity, page_token, ..
            } => Some(SyncFailure {
                kind: FailureKind::FetchFailed,
                entity: Some(*entity),
                message: self.to_string(),
                page: Some(pages_done + 1),
                resume_page_token: page_token.clone(),
            }),
            SyncError::UpsertFailed {
                entity,
                page,
                page_token,
                ..
            } => Some(SyncFailure {
                kind: FailureKind::UpsertFailed,
                entity: Some(*entity),
                message: self.to_string(),
                page: *page,
                resume_page_token: page_token.clone(),
            }),
            SyncError::StateStore(_) => Some(SyncFailure {
                kind: FailureKind::StateStore,
                entity: None,
                message: self.to_string(),
                page: None,
                resume_page_token: None,
            }),
            SyncError::SyncAlreadyRunning { .. } => None,
        }
    }
}
