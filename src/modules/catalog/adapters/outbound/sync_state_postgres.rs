// Postgres implementation of the SyncStateRepository port.
//
// Responsibilities
// - Keep one `sync_cursors` row per entity type.
// - Take run markers under row locks so two workers cannot both begin.
// - Write cursors only for a run that still holds its markers.

use crate::modules::catalog::adapters::outbound::sync_state::{
    StateError, SyncStateRepository, SyncStateSnapshot,
};
use crate::modules::catalog::core::cursor::{CursorState, EntitySyncState, RunLease, Watermark};
use crate::modules::catalog::core::entity::EntityType;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresSyncState {
    pool: PgPool,
}

impl PostgresSyncState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(error: sqlx::Error) -> StateError {
    StateError::Backend(error.to_string())
}

#[derive(sqlx::FromRow)]
struct CursorRecord {
    entity_type: String,
    synced_through: Option<DateTime<Utc>>,
    version: i64,
    running_run_id: Option<Uuid>,
    running_since: Option<DateTime<Utc>>,
}

impl CursorRecord {
    fn into_state(self) -> Option<(EntityType, EntitySyncState)> {
        let entity = match self.entity_type.parse::<EntityType>() {
            Ok(entity) => entity,
            Err(error) => {
                tracing::warn!(%error, "ignoring sync cursor row");
                return None;
            }
        };
        let cursor = match self.synced_through {
            None => CursorState::Fresh,
            Some(synced_through) => CursorState::Primed(Watermark {
                synced_through,
                version: self.version,
            }),
        };
        let running = match (self.running_run_id, self.running_since) {
            (Some(run_id), Some(started_at)) => Some(RunLease { run_id, started_at }),
            _ => None,
        };
        Some((entity, EntitySyncState { cursor, running }))
    }
}

fn snapshot_from(records: Vec<CursorRecord>) -> SyncStateSnapshot {
    let mut snapshot: SyncStateSnapshot = EntityType::SYNC_ORDER
        .into_iter()
        .map(|entity| (entity, EntitySyncState::default()))
        .collect();
    snapshot.extend(records.into_iter().filter_map(CursorRecord::into_state));
    snapshot
}

const SELECT_CURSORS: &str = "SELECT entity_type, synced_through, version, running_run_id, \
     running_since FROM sync_cursors";

#[async_trait::async_trait]
impl SyncStateRepository for PostgresSyncState {
    async fn load(&self) -> Result<SyncStateSnapshot, StateError> {
        let records: Vec<CursorRecord> = sqlx::query_as(SELECT_CURSORS)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(snapshot_from(records))
    }

    async fn try_begin(
        &self,
        entities: &[EntityType],
        lease: RunLease,
        lease_ttl: Duration,
    ) -> Result<SyncStateSnapshot, StateError> {
        let names: Vec<String> = entities.iter().map(|e| e.as_str().to_string()).collect();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO sync_cursors (entity_type) SELECT unnest($1::text[]) \
             ON CONFLICT (entity_type) DO NOTHING",
        )
        .bind(&names)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let records: Vec<CursorRecord> =
            sqlx::query_as(&format!("{SELECT_CURSORS} ORDER BY entity_type FOR UPDATE"))
                .fetch_all(&mut *tx)
                .await
                .map_err(backend)?;
        let snapshot = snapshot_from(records);

        let now = Utc::now();
        for entity in entities {
            let held = snapshot
                .get(entity)
                .and_then(|state| state.running)
                .filter(|held| !held.is_expired(now, lease_ttl));
            if let Some(held) = held {
                tx.rollback().await.map_err(backend)?;
                return Err(StateError::AlreadyRunning {
                    entity: *entity,
                    run_id: held.run_id,
                });
            }
        }

        sqlx::query(
            "UPDATE sync_cursors SET running_run_id = $1, running_since = $2, updated_at = now() \
             WHERE entity_type = ANY($3)",
        )
        .bind(lease.run_id)
        .bind(lease.started_at)
        .bind(&names)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        let mut snapshot = snapshot;
        for entity in entities {
            snapshot.entry(*entity).or_default().running = Some(lease);
        }
        Ok(snapshot)
    }

    async fn commit(
        &self,
        run_id: Uuid,
        cursors: &[(EntityType, CursorState)],
    ) -> Result<(), StateError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for (entity, cursor) in cursors {
            let watermark = cursor.watermark();
            let result = sqlx::query(
                "UPDATE sync_cursors SET synced_through = $1, version = $2, \
                   running_run_id = NULL, running_since = NULL, updated_at = now() \
                 WHERE entity_type = $3 AND running_run_id = $4",
            )
            .bind(watermark.map(|w| w.synced_through))
            .bind(watermark.map(|w| w.version).unwrap_or(0))
            .bind(entity.as_str())
            .bind(run_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
            if result.rows_affected() == 0 {
                tx.rollback().await.map_err(backend)?;
                return Err(StateError::LeaseLost(run_id));
            }
        }
        sqlx::query(
            "UPDATE sync_cursors SET running_run_id = NULL, running_since = NULL \
             WHERE running_run_id = $1",
        )
        .bind(run_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)
    }

    async fn release(&self, run_id: Uuid) -> Result<(), StateError> {
        sqlx::query(
            "UPDATE sync_cursors SET running_run_id = NULL, running_since = NULL, \
               updated_at = now() \
             WHERE running_run_id = $1",
        )
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}
