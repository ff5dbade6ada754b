use crate::modules::catalog::adapters::outbound::catalog_source_in_memory::InMemoryCatalogSource;
use crate::modules::catalog::adapters::outbound::catalog_store_in_memory::InMemoryCatalogStore;
use crate::modules::catalog::adapters::outbound::sync_state_in_memory::InMemorySyncState;
use crate::modules::catalog::use_cases::run_catalog_sync::handler::{
    RunCatalogSyncHandler, SyncSettings,
};
use crate::shared::infrastructure::retry_policy::RetryPolicy;
use crate::shell::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// App state wired to in memory adapters, with handles to inspect them.
pub struct InMemoryApp {
    pub state: AppState,
    pub source: Arc<InMemoryCatalogSource>,
    pub store: Arc<InMemoryCatalogStore>,
    pub sync_state: Arc<InMemorySyncState>,
}

pub fn fast_settings() -> SyncSettings {
    SyncSettings {
        page_size: 2,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            rate_limit_cooldown: Duration::from_millis(5),
            page_timeout: Duration::from_secs(5),
        },
        ..SyncSettings::default()
    }
}

pub fn in_memory_app() -> InMemoryApp {
    in_memory_app_with(
        InMemoryCatalogSource::new(),
        InMemoryCatalogStore::new(),
        InMemorySyncState::new(),
    )
}

pub fn in_memory_app_with(
    source: InMemoryCatalogSource,
    store: InMemoryCatalogStore,
    sync_state: InMemorySyncState,
) -> InMemoryApp {
    let source = Arc::new(source);
    let store = Arc::new(store);
    let sync_state = Arc::new(sync_state);
    let runner = Arc::new(RunCatalogSyncHandler::new(
        source.clone(),
        store.clone(),
        sync_state.clone(),
        fast_settings(),
    ));
    InMemoryApp {
        state: AppState {
            sync_runner: runner,
            sync_state: sync_state.clone(),
            queries: store.clone(),
        },
        source,
        store,
        sync_state,
    }
}
