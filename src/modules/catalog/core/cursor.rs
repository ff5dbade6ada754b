use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::Incremental => "incremental",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Instant the committing run started; upstream changes at or after it are refetched.
    pub synced_through: DateTime<Utc>,
    /// Bumped on every commit.
    pub version: i64,
}

/// Persisted incremental cursor of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CursorState {
    #[default]
    Fresh,
    Primed(Watermark),
}

impl CursorState {
    /// Mode a stage actually runs in. Fresh cursors can only be primed by a full sync.
    pub fn effective_mode(&self, requested: SyncMode) -> SyncMode {
        match (self, requested) {
            (CursorState::Fresh, _) => SyncMode::Full,
            (CursorState::Primed(_), mode) => mode,
        }
    }

    /// Lower bound of the "changes since" window, or `None` for a full fetch.
    pub fn fetch_since(&self, mode: SyncMode, overlap: Duration) -> Option<DateTime<Utc>> {
        match (self, mode) {
            (CursorState::Primed(watermark), SyncMode::Incremental) => {
                Some(watermark.synced_through - overlap)
            }
            _ => None,
        }
    }

    /// State to persist once a run that started at `run_started_at` fully commits.
    pub fn advance(&self, run_started_at: DateTime<Utc>) -> CursorState {
        let version = match self {
            CursorState::Fresh => 1,
            CursorState::Primed(watermark) => watermark.version + 1,
        };
        CursorState::Primed(Watermark {
            synced_through: run_started_at,
            version,
        })
    }

    pub fn watermark(&self) -> Option<&Watermark> {
        match self {
            CursorState::Fresh => None,
            CursorState::Primed(watermark) => Some(watermark),
        }
    }
}

/// Run-in-progress marker held on an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLease {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl RunLease {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.started_at + ttl <= now
    }
}

/// Persisted sync state of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EntitySyncState {
    pub cursor: CursorState,
    pub running: Option<RunLease>,
}
