use crate::modules::catalog::adapters::outbound::sync_state::SyncStateRepository;
use crate::modules::catalog::use_cases::find_catalog_item::queries_port::CatalogQueries;
use crate::modules::catalog::use_cases::run_catalog_sync::handler::SyncRunner;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub sync_runner: Arc<dyn SyncRunner>,
    pub sync_state: Arc<dyn SyncStateRepository>,
    pub queries: Arc<dyn CatalogQueries + Send + Sync>,
}
