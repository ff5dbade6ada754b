use async_graphql::{Context, Enum, Object, Result as GqlResult, SimpleObject};
use chrono::{DateTime, Utc};

use crate::modules::catalog::core::summary::{EntitySummary, SyncFailure, SyncSummary};
use crate::modules::catalog::use_cases::run_catalog_sync::command::RunCatalogSync;
use crate::shell::state::AppState;

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
#[graphql(name = "SyncMode", remote = "crate::modules::catalog::core::cursor::SyncMode")]
pub enum GqlSyncMode {
    Full,
    Incremental,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
#[graphql(name = "EntityType", remote = "crate::modules::catalog::core::entity::EntityType")]
pub enum GqlEntityType {
    Locations,
    Categories,
    Items,
    Variations,
    Inventory,
    VendorInfo,
}

#[derive(SimpleObject, Clone)]
#[graphql(name = "EntitySummary")]
pub struct GqlEntitySummary {
    pub entity: GqlEntityType,
    pub mode: GqlSyncMode,
    pub pages: u64,
    pub fetched: u64,
    pub skipped: u64,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub orphaned: u64,
    pub archived: u64,
}

#[derive(SimpleObject, Clone)]
#[graphql(name = "SyncFailure")]
pub struct GqlSyncFailure {
    pub kind: String,
    pub entity: Option<GqlEntityType>,
    pub message: String,
    pub page: Option<u64>,
    pub resume_page_token: Option<String>,
}

#[derive(SimpleObject, Clone)]
#[graphql(name = "SyncSummary")]
pub struct GqlSyncSummary {
    pub run_id: String,
    pub requested_mode: GqlSyncMode,
    pub succeeded: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cursor_advanced: bool,
    pub entities: Vec<GqlEntitySummary>,
    pub failure: Option<GqlSyncFailure>,
}

impl From<EntitySummary> for GqlEntitySummary {
    fn from(s: EntitySummary) -> Self {
        Self {
            entity: s.entity.into(),
            mode: s.mode.into(),
            pages: s.pages,
            fetched: s.fetched,
            skipped: s.skipped,
            inserted: s.writes.inserted,
            updated: s.writes.updated,
            unchanged: s.writes.unchanged,
            orphaned: s.writes.orphaned,
            archived: s.archived,
        }
    }
}

impl From<SyncFailure> for GqlSyncFailure {
    fn from(f: SyncFailure) -> Self {
        Self {
            kind: f.kind.as_str().to_string(),
            entity: f.entity.map(Into::into),
            message: f.message,
            page: f.page,
            resume_page_token: f.resume_page_token,
        }
    }
}

impl From<SyncSummary> for GqlSyncSummary {
    fn from(s: SyncSummary) -> Self {
        Self {
            run_id: s.run_id.to_string(),
            requested_mode: s.requested_mode.into(),
            succeeded: s.failure.is_none(),
            started_at: s.started_at,
            finished_at: s.finished_at,
            cursor_advanced: s.cursor_advanced,
            entities: s.entities.into_iter().map(Into::into).collect(),
            failure: s.failure.map(Into::into),
        }
    }
}

#[derive(Default)]
pub struct RunSyncMutation;

#[Object]
impl RunSyncMutation {
    /// Runs a sync now and returns its summary. A run that failed part-way still
    /// returns a summary; only a refused or unrecordable run is an error.
    async fn run_sync(
        &self,
        context: &Context<'_>,
        mode: GqlSyncMode,
        entities: Option<Vec<GqlEntityType>>,
    ) -> GqlResult<GqlSyncSummary> {
        let state = context.data_unchecked::<AppState>();
        let command = RunCatalogSync {
            mode: mode.into(),
            entities: entities
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
        };
        let runner = state.sync_runner.clone();
        let summary = tokio::spawn(async move { runner.run(command).await })
            .await
            .map_err(|e| async_graphql::Error::new(format!("sync run aborted: {e}")))?
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;
        Ok(summary.into())
    }
}
