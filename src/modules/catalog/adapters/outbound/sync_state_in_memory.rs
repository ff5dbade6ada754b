// In memory implementation of the SyncStateRepository port.
//
// Purpose
// - Support handler tests and local development without a database.
//
// Responsibilities
// - Hold cursor and run marker per entity type behind one lock so begin and commit are atomic.

use crate::modules::catalog::adapters::outbound::sync_state::{
    StateError, SyncStateRepository, SyncStateSnapshot,
};
use crate::modules::catalog::core::cursor::{CursorState, EntitySyncState, RunLease};
use crate::modules::catalog::core::entity::EntityType;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemorySyncState {
    inner: Mutex<SyncStateSnapshot>,
    is_offline: bool,
}

impl InMemorySyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn cursor(&self, entity: EntityType) -> CursorState {
        self.inner
            .lock()
            .await
            .get(&entity)
            .map(|state| state.cursor)
            .unwrap_or_default()
    }

    /// Plants a marker as if another worker had started a run.
    pub async fn hold_lease(&self, entity: EntityType, lease: RunLease) {
        self.inner.lock().await.entry(entity).or_default().running = Some(lease);
    }

    fn offline_guard(&self) -> Result<(), StateError> {
        if self.is_offline {
            return Err(StateError::Backend("Sync state offline".into()));
        }
        Ok(())
    }
}

fn with_every_entity(snapshot: &SyncStateSnapshot) -> SyncStateSnapshot {
    EntityType::SYNC_ORDER
        .into_iter()
        .map(|entity| (entity, snapshot.get(&entity).copied().unwrap_or_default()))
        .collect()
}

#[async_trait::async_trait]
impl SyncStateRepository for InMemorySyncState {
    async fn load(&self) -> Result<SyncStateSnapshot, StateError> {
        self.offline_guard()?;
        Ok(with_every_entity(&*self.inner.lock().await))
    }

    async fn try_begin(
        &self,
        entities: &[EntityType],
        lease: RunLease,
        lease_ttl: Duration,
    ) -> Result<SyncStateSnapshot, StateError> {
        self.offline_guard()?;
        let mut guard = self.inner.lock().await;
        let now = Utc::now();
        for entity in entities {
            let held = guard
                .get(entity)
                .and_then(|state| state.running)
                .filter(|lease| !lease.is_expired(now, lease_ttl));
            if let Some(held) = held {
                return Err(StateError::AlreadyRunning {
                    entity: *entity,
                    run_id: held.run_id,
                });
            }
        }
        for entity in entities {
            guard.entry(*entity).or_insert_with(EntitySyncState::default).running = Some(lease);
        }
        Ok(with_every_entity(&guard))
    }

    async fn commit(
        &self,
        run_id: Uuid,
        cursors: &[(EntityType, CursorState)],
    ) -> Result<(), StateError> {
        self.offline_guard()?;
        let mut guard = self.inner.lock().await;
        let holds_every_lease = cursors.iter().all(|(entity, _)| {
            guard
                .get(entity)
                .and_then(|state| state.running)
                .is_some_and(|lease| lease.run_id == run_id)
        });
        if !holds_every_lease {
            return Err(StateError::LeaseLost(run_id));
        }
        for (entity, cursor) in cursors {
            let state = guard.entry(*entity).or_default();
            state.cursor = *cursor;
            state.running = None;
        }
        for state in guard.values_mut() {
            if state.running.is_some_and(|lease| lease.run_id == run_id) {
                state.running = None;
            }
        }
        Ok(())
    }

    async fn release(&self, run_id: Uuid) -> Result<(), StateError> {
        self.offline_guard()?;
        let mut guard = self.inner.lock().await;
        for state in guard.values_mut() {
            if state.running.is_some_and(|lease| lease.run_id == run_id) {
                state.running = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod sync_state_in_memory_tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn lease() -> RunLease {
        RunLease {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
        }
    }

    fn ttl() -> Duration {
        Duration::minutes(30)
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_every_entity_fresh_and_idle() {
        let state = InMemorySyncState::new();
        let snapshot = state.load().await.expect("load failed");
        assert_eq!(snapshot.len(), EntityType::SYNC_ORDER.len());
        assert!(snapshot.values().all(|s| *s == EntitySyncState::default()));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_refuse_a_second_run_on_a_held_entity(lease: RunLease) {
        let state = InMemorySyncState::new();
        state
            .try_begin(&[EntityType::Items, EntityType::Variations], lease, ttl())
            .await
            .expect("first begin failed");

        let second = RunLease {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
        };
        let result = state.try_begin(&[EntityType::Variations], second, ttl()).await;
        assert_eq!(
            result.unwrap_err(),
            StateError::AlreadyRunning {
                entity: EntityType::Variations,
                run_id: lease.run_id
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_take_over_an_expired_lease(lease: RunLease) {
        let state = InMemorySyncState::new();
        let stale = RunLease {
            run_id: Uuid::now_v7(),
            started_at: Utc::now() - Duration::hours(2),
        };
        state.hold_lease(EntityType::Items, stale).await;
        let snapshot = state
            .try_begin(&[EntityType::Items], lease, ttl())
            .await
            .expect("begin failed");
        assert_eq!(snapshot[&EntityType::Items].running, Some(lease));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_commit_cursors_and_clear_markers(lease: RunLease) {
        let state = InMemorySyncState::new();
        state
            .try_begin(&[EntityType::Items], lease, ttl())
            .await
            .expect("begin failed");
        let advanced = CursorState::Fresh.advance(lease.started_at);
        state
            .commit(lease.run_id, &[(EntityType::Items, advanced)])
            .await
            .expect("commit failed");

        let snapshot = state.load().await.expect("load failed");
        assert_eq!(snapshot[&EntityType::Items].cursor, advanced);
        assert_eq!(snapshot[&EntityType::Items].running, None);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_a_commit_from_a_run_that_lost_its_lease(lease: RunLease) {
        let state = InMemorySyncState::new();
        let result = state
            .commit(
                lease.run_id,
                &[(EntityType::Items, CursorState::Fresh.advance(lease.started_at))],
            )
            .await;
        assert_eq!(result.unwrap_err(), StateError::LeaseLost(lease.run_id));
        assert_eq!(state.cursor(EntityType::Items).await, CursorState::Fresh);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_release_without_touching_cursors(lease: RunLease) {
        let state = InMemorySyncState::new();
        state
            .try_begin(&[EntityType::Items], lease, ttl())
            .await
            .expect("begin failed");
        state.release(lease.run_id).await.expect("release failed");
        let snapshot = state.load().await.expect("load failed");
        assert_eq!(snapshot[&EntityType::Items], EntitySyncState::default());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_if_offline(lease: RunLease) {
        let mut state = InMemorySyncState::new();
        state.toggle_offline();
        let result = state.try_begin(&[EntityType::Items], lease, ttl()).await;
        assert_eq!(
            result.unwrap_err(),
            StateError::Backend("Sync state offline".into())
        );
    }
}
