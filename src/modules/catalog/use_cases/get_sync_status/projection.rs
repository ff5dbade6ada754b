use crate::modules::catalog::adapters::outbound::sync_state::SyncStateSnapshot;
use crate::modules::catalog::core::cursor::CursorState;
use crate::modules::catalog::core::entity::EntityType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySyncStatus {
    pub entity: EntityType,
    /// `fresh` until the first full sync of this entity type commits.
    pub cursor: &'static str,
    pub synced_through: Option<DateTime<Utc>>,
    pub cursor_version: Option<i64>,
    pub running_run_id: Option<Uuid>,
    pub running_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatusView {
    pub entities: Vec<EntitySyncStatus>,
}

impl SyncStatusView {
    pub fn from_snapshot(snapshot: &SyncStateSnapshot) -> Self {
        let entities = EntityType::SYNC_ORDER
            .into_iter()
            .map(|entity| {
                let state = snapshot.get(&entity).copied().unwrap_or_default();
                let watermark = state.cursor.watermark();
                EntitySyncStatus {
                    entity,
                    cursor: match state.cursor {
                        CursorState::Fresh => "fresh",
                        CursorState::Primed(_) => "primed",
                    },
                    synced_through: watermark.map(|w| w.synced_through),
                    cursor_version: watermark.map(|w| w.version),
                    running_run_id: state.running.map(|lease| lease.run_id),
                    running_since: state.running.map(|lease| lease.started_at),
                }
            })
            .collect();
        Self { entities }
    }
}
