// Orchestrates one catalog sync run.
//
// Purpose
// - Drive every requested entity type through fetch, map and upsert in dependency order.
//
// Responsibilities
// - Take the run lease before any fetch and give it back on every exit path,
//   including the run future being dropped mid-flight.
// - Archive rows a full stage did not see.
// - Advance cursors only when every stage of the run committed.
//
// Boundaries
// - Pages already committed stay committed when a later page fails.

use crate::modules::catalog::adapters::outbound::catalog_source::CatalogSource;
use crate::modules::catalog::adapters::outbound::catalog_store::CatalogStore;
use crate::modules::catalog::adapters::outbound::sync_state::{
    SyncStateRepository, SyncStateSnapshot,
};
use crate::modules::catalog::core::cursor::{CursorState, RunLease, SyncMode};
use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::mapper::map_page;
use crate::modules::catalog::core::rows::RowKey;
use crate::modules::catalog::core::summary::{EntitySummary, RunStatus, SyncSummary};
use crate::modules::catalog::use_cases::run_catalog_sync::command::RunCatalogSync;
use crate::modules::catalog::use_cases::run_catalog_sync::errors::SyncError;
use crate::modules::catalog::use_cases::run_catalog_sync::fetcher::Fetcher;
use crate::shared::infrastructure::retry_policy::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub page_size: u32,
    pub retry: RetryPolicy,
    /// Subtracted from the watermark to absorb clock skew between us and upstream.
    pub cursor_overlap: chrono::Duration,
    pub lease_ttl: chrono::Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            retry: RetryPolicy::default(),
            cursor_overlap: chrono::Duration::seconds(60),
            lease_ttl: chrono::Duration::minutes(30),
        }
    }
}

/// Entry point the inbound adapters use to trigger a run.
#[async_trait]
pub trait SyncRunner: Send + Sync {
    async fn run(&self, command: RunCatalogSync) -> Result<SyncSummary, SyncError>;
}

pub struct RunCatalogSyncHandler<TSource, TStore, TState>
where
    TSource: CatalogSource + ?Sized + 'static,
    TStore: CatalogStore + ?Sized + 'static,
    TState: SyncStateRepository + ?Sized + 'static,
{
    fetcher: Fetcher<TSource>,
    store: Arc<TStore>,
    state: Arc<TState>,
    settings: SyncSettings,
}

/// Gives the lease back if the run future is dropped before it reaches a release or commit.
struct LeaseGuard<TState>
where
    TState: SyncStateRepository + ?Sized + 'static,
{
    state: Arc<TState>,
    run_id: Uuid,
    armed: bool,
}

impl<TState> LeaseGuard<TState>
where
    TState: SyncStateRepository + ?Sized + 'static,
{
    fn new(state: Arc<TState>, run_id: Uuid) -> Self {
        Self {
            state,
            run_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<TState> Drop for LeaseGuard<TState>
where
    TState: SyncStateRepository + ?Sized + 'static,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let run_id = self.run_id;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(%run_id, "sync run dropped outside a runtime; lease will expire");
            return;
        };
        tracing::warn!(%run_id, "sync run cancelled; releasing lease");
        let state = self.state.clone();
        runtime.spawn(async move {
            if let Err(error) = state.release(run_id).await {
                tracing::warn!(%run_id, %error, "could not release run lease; it will expire");
            }
        });
    }
}

/// Keys seen so far in this run, per entity type.
type SeenKeys = HashMap<EntityType, HashSet<RowKey>>;

struct Stage {
    entity: EntityType,
    mode: SyncMode,
    since: Option<DateTime<Utc>>,
}

impl<TSource, TStore, TState> RunCatalogSyncHandler<TSource, TStore, TState>
where
    TSource: CatalogSource + ?Sized + 'static,
    TStore: CatalogStore + ?Sized + 'static,
    TState: SyncStateRepository + ?Sized + 'static,
{
    pub fn new(
        source: Arc<TSource>,
        store: Arc<TStore>,
        state: Arc<TState>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(source, settings.retry, settings.page_size),
            store,
            state,
            settings,
        }
    }

    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn handle(&self, command: RunCatalogSync) -> Result<SyncSummary, SyncError> {
        let entities = EntityType::ordered(&command.entities);
        let lease = RunLease {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
        };
        tracing::Span::current().record("run_id", tracing::field::display(lease.run_id));

        let snapshot = self
            .state
            .try_begin(&entities, lease, self.settings.lease_ttl)
            .await
            .map_err(SyncError::from)?;
        let mut lease_guard = LeaseGuard::new(self.state.clone(), lease.run_id);
        tracing::info!(mode = command.mode.as_str(), entities = entities.len(), "sync run started");

        let mut summary = SyncSummary {
            run_id: lease.run_id,
            requested_mode: command.mode,
            status: RunStatus::Succeeded,
            started_at: lease.started_at,
            finished_at: lease.started_at,
            cursor_advanced: false,
            entities: Vec::with_capacity(entities.len()),
            failure: None,
        };

        let mut seen = SeenKeys::new();
        for entity in &entities {
            let stage = self.plan_stage(*entity, command.mode, &snapshot);
            let mut entity_summary = EntitySummary::new(stage.entity, stage.mode);
            let outcome = self.run_stage(&stage, &mut entity_summary, &mut seen).await;
            let pages_done = entity_summary.pages;
            summary.entities.push(entity_summary);
            if let Err(error) = outcome {
                tracing::error!(entity = %stage.entity, %error, "sync stage failed");
                summary.status = RunStatus::Failed;
                summary.failure = error.to_failure(pages_done);
                break;
            }
        }

        if summary.status == RunStatus::Succeeded {
            let cursors: Vec<(EntityType, CursorState)> = entities
                .iter()
                .map(|entity| {
                    let current = snapshot.get(entity).map(|s| s.cursor).unwrap_or_default();
                    (*entity, current.advance(lease.started_at))
                })
                .collect();
            if let Err(error) = self.state.commit(lease.run_id, &cursors).await {
                self.release(lease.run_id).await;
                lease_guard.disarm();
                return Err(SyncError::StateStore(error));
            }
            lease_guard.disarm();
            summary.cursor_advanced = true;
        } else {
            self.release(lease.run_id).await;
            lease_guard.disarm();
        }

        summary.finished_at = Utc::now();
        let totals = summary.total_writes();
        tracing::info!(
            status = ?summary.status,
            inserted = totals.inserted,
            updated = totals.updated,
            unchanged = totals.unchanged,
            orphaned = totals.orphaned,
            archived = summary.total_archived(),
            skipped = summary.total_skipped(),
            "sync run finished"
        );
        Ok(summary)
    }

    fn plan_stage(
        &self,
        entity: EntityType,
        requested: SyncMode,
        snapshot: &SyncStateSnapshot,
    ) -> Stage {
        let cursor = snapshot.get(&entity).map(|s| s.cursor).unwrap_or_default();
        let mode = if entity.supports_incremental() {
            cursor.effective_mode(requested)
        } else {
            SyncMode::Full
        };
        if mode != requested {
            tracing::info!(%entity, requested = requested.as_str(), actual = mode.as_str(), "stage mode overridden");
        }
        Stage {
            entity,
            mode,
            since: cursor.fetch_since(mode, self.settings.cursor_overlap),
        }
    }

    async fn run_stage(
        &self,
        stage: &Stage,
        summary: &mut EntitySummary,
        seen: &mut SeenKeys,
    ) -> Result<(), SyncError> {
        let mut pages = self.fetcher.open(stage.entity, stage.since, None);
        loop {
            let page_token = pages.position().map(str::to_string);
            let Some(page) = pages.next_page().await? else {
                break;
            };
            summary.pages += 1;
            summary.fetched += page.records.len() as u64;

            let mapped = map_page(stage.entity, &page.records);
            summary.skipped += mapped.skipped.len() as u64;
            // Keep rows we could not read this time out of the archive sweep.
            for skipped in &mapped.skipped {
                let keyed_by_id =
                    !matches!(skipped.entity, EntityType::Inventory | EntityType::VendorInfo);
                if let (true, Some(id)) = (keyed_by_id, &skipped.external_id) {
                    seen.entry(skipped.entity).or_default().insert(id.clone());
                }
            }
            for row in &mapped.rows {
                seen.entry(row.entity()).or_default().insert(row.key());
            }
            if mapped.rows.is_empty() {
                continue;
            }

            let write = self
                .store
                .upsert_page(&mapped.rows)
                .await
                .map_err(|source| SyncError::UpsertFailed {
                    entity: stage.entity,
                    page: Some(summary.pages),
                    page_token,
                    source,
                })?;
            summary.writes += write.total();
            tracing::debug!(
                entity = %stage.entity,
                page = summary.pages,
                inserted = write.total().inserted,
                updated = write.total().updated,
                "page committed"
            );
        }

        if stage.mode == SyncMode::Full {
            let keys = seen.remove(&stage.entity).unwrap_or_default();
            summary.archived = self
                .store
                .archive_missing(stage.entity, &keys)
                .await
                .map_err(|source| SyncError::UpsertFailed {
                    entity: stage.entity,
                    page: None,
                    page_token: None,
                    source,
                })?;
            if summary.archived > 0 {
                tracing::info!(entity = %stage.entity, archived = summary.archived, "archived rows missing upstream");
            }
        }
        Ok(())
    }

    async fn release(&self, run_id: Uuid) {
        if let Err(error) = self.state.release(run_id).await {
            tracing::warn!(%run_id, %error, "could not release run lease; it will expire");
        }
    }
}

#[async_trait]
impl<TSource, TStore, TState> SyncRunner for RunCatalogSyncHandler<TSource, TStore, TState>
where
    TSource: CatalogSource + ?Sized + 'static,
    TStore: CatalogStore + ?Sized + 'static,
    TState: SyncStateRepository + ?Sized + 'static,
{
    async fn run(&self, command: RunCatalogSync) -> Result<SyncSummary, SyncError> {
        self.handle(command).await
    }
}
