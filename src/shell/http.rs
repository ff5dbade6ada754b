use axum::{
    Router,
    routing::{get, post},
};

use crate::modules::catalog::use_cases::find_catalog_item::inbound::http as find_item_http;
use crate::modules::catalog::use_cases::get_sync_status::inbound::http as sync_status_http;
use crate::modules::catalog::use_cases::run_catalog_sync::inbound::http as run_sync_http;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sync/full", post(run_sync_http::handle_full))
        .route("/sync/incremental", post(run_sync_http::handle_incremental))
        .route("/sync/status", get(sync_status_http::handle))
        .route("/catalog/items/{external_id}", get(find_item_http::handle))
        .with_state(state)
}
