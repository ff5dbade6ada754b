use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::shell::state::AppState;

pub async fn handle(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> impl IntoResponse {
    match state.queries.find_item(&external_id).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => {
            tracing::error!(%external_id, %error, "catalog lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
