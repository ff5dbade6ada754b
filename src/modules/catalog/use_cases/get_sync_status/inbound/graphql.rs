use async_graphql::{Context, Object, Result as GqlResult, SimpleObject};
use chrono::{DateTime, Utc};

use crate::modules::catalog::use_cases::get_sync_status::projection::{
    EntitySyncStatus, SyncStatusView,
};
use crate::modules::catalog::use_cases::run_catalog_sync::inbound::graphql::GqlEntityType;
use crate::shell::state::AppState;

#[derive(SimpleObject, Clone)]
#[graphql(name = "EntitySyncStatus")]
pub struct GqlEntitySyncStatus {
    pub entity: GqlEntityType,
    pub cursor: String,
    pub synced_through: Option<DateTime<Utc>>,
    pub cursor_version: Option<i64>,
    pub running_run_id: Option<String>,
    pub running_since: Option<DateTime<Utc>>,
}

impl From<EntitySyncStatus> for GqlEntitySyncStatus {
    fn from(v: EntitySyncStatus) -> Self {
        Self {
            entity: v.entity.into(),
            cursor: v.cursor.to_string(),
            synced_through: v.synced_through,
            cursor_version: v.cursor_version,
            running_run_id: v.running_run_id.map(|id| id.to_string()),
            running_since: v.running_since,
        }
    }
}

#[derive(Default)]
pub struct SyncStatusQuery;

#[Object]
impl SyncStatusQuery {
    async fn sync_status(&self, context: &Context<'_>) -> GqlResult<Vec<GqlEntitySyncStatus>> {
        let state = context.data_unchecked::<AppState>();
        let snapshot = state
            .sync_state
            .load()
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;
        Ok(SyncStatusView::from_snapshot(&snapshot)
            .entities
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
