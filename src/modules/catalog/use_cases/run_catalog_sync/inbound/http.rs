use axum::{
    Json, extract::State, extract::rejection::JsonRejection, http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::catalog::core::cursor::SyncMode;
use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::summary::RunStatus;
use crate::modules::catalog::use_cases::run_catalog_sync::command::RunCatalogSync;
use crate::modules::catalog::use_cases::run_catalog_sync::errors::SyncError;
use crate::shell::state::AppState;

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RunSyncBody {
    #[serde(default)]
    pub entities: Vec<EntityType>,
}

#[derive(Serialize)]
pub struct SyncRejectedResponse {
    pub error: String,
    pub entity: Option<EntityType>,
    pub run_id: Option<Uuid>,
}

pub async fn handle_full(
    State(state): State<AppState>,
    body: Result<Json<RunSyncBody>, JsonRejection>,
) -> impl IntoResponse {
    run(state, SyncMode::Full, body).await
}

pub async fn handle_incremental(
    State(state): State<AppState>,
    body: Result<Json<RunSyncBody>, JsonRejection>,
) -> impl IntoResponse {
    run(state, SyncMode::Incremental, body).await
}

async fn run(
    state: AppState,
    mode: SyncMode,
    body: Result<Json<RunSyncBody>, JsonRejection>,
) -> axum::response::Response {
    let body = match body {
        Ok(Json(b)) => b,
        // No body at all means "every entity type".
        Err(JsonRejection::MissingJsonContentType(_)) => RunSyncBody::default(),
        Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };

    let command = RunCatalogSync {
        mode,
        entities: body.entities,
    };

    // Detached so a client hanging up does not abort the run half-way.
    let runner = state.sync_runner.clone();
    let outcome = match tokio::spawn(async move { runner.run(command).await }).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::error!(%error, "sync run task did not complete");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncRejectedResponse {
                    error: "sync run aborted".into(),
                    entity: None,
                    run_id: None,
                }),
            )
                .into_response();
        }
    };

    match outcome {
        Ok(summary) if summary.status == RunStatus::Succeeded => Json(summary).into_response(),
        Ok(summary) => (StatusCode::BAD_GATEWAY, Json(summary)).into_response(),
        Err(SyncError::SyncAlreadyRunning { entity, run_id }) => (
            StatusCode::CONFLICT,
            Json(SyncRejectedResponse {
                error: "sync already running".into(),
                entity: Some(entity),
                run_id: Some(run_id),
            }),
        )
            .into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SyncRejectedResponse {
                error: error.to_string(),
                entity: None,
                run_id: None,
            }),
        )
            .into_response(),
    }
}
