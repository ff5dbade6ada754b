use crate::modules::catalog::core::cursor::SyncMode;
use crate::modules::catalog::core::entity::EntityType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use uuid::Uuid;

/// Outcome of writing rows of one entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCounts {
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    /// Rows not written because a parent row is unknown locally.
    pub orphaned: u64,
}

impl WriteCounts {
    pub fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}

impl AddAssign for WriteCounts {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.orphaned += other.orphaned;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity: EntityType,
    pub mode: SyncMode,
    pub pages: u64,
    pub fetched: u64,
    pub skipped: u64,
    pub writes: WriteCounts,
    pub archived: u64,
}

impl EntitySummary {
    pub fn new(entity: EntityType, mode: SyncMode) -> Self {
        Self {
            entity,
            mode,
            pages: 0,
            fetched: 0,
            skipped: 0,
            writes: WriteCounts::default(),
            archived: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FetchFailed,
    UpsertFailed,
    StateStore,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::FetchFailed => "fetch_failed",
            FailureKind::UpsertFailed => "upsert_failed",
            FailureKind::StateStore => "state_store",
        }
    }
}

/// First error that stopped a run, with enough position to resume from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub entity: Option<EntityType>,
    pub message: String,
    pub page: Option<u64>,
    pub resume_page_token: Option<String>,
}

/// Result of one sync run as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub requested_mode: SyncMode,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cursor_advanced: bool,
    pub entities: Vec<EntitySummary>,
    pub failure: Option<SyncFailure>,
}

impl SyncSummary {
    pub fn entity(&self, entity: EntityType) -> Option<&EntitySummary> {
        self.entities.iter().find(|e| e.entity == entity)
    }

    pub fn total_writes(&self) -> WriteCounts {
        let mut total = WriteCounts::default();
        for entity in &self.entities {
            total += entity.writes;
        }
        total
    }

    pub fn total_archived(&self) -> u64 {
        self.entities.iter().map(|e| e.archived).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.entities.iter().map(|e| e.skipped).sum()
    }

    pub fn first_error(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }
}
