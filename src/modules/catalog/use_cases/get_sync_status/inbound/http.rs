use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::modules::catalog::use_cases::get_sync_status::projection::SyncStatusView;
use crate::shell::state::AppState;

pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    match state.sync_state.load().await {
        Ok(snapshot) => Json(SyncStatusView::from_snapshot(&snapshot)).into_response(),
        Err(error) => {
            tracing::error!(%error, "could not load sync state");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod get_sync_status_http_inbound_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::modules::catalog::adapters::outbound::catalog_source_in_memory::InMemoryCatalogSource;
    use crate::modules::catalog::adapters::outbound::catalog_store_in_memory::InMemoryCatalogStore;
    use crate::modules::catalog::adapters::outbound::sync_state_in_memory::InMemorySyncState;
    use crate::modules::catalog::core::entity::EntityType;
    use crate::modules::catalog::use_cases::run_catalog_sync::command::RunCatalogSync;
    use crate::shell::state::AppState;
    use crate::tests::fixtures::app::{in_memory_app, in_memory_app_with};

    use super::handle;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/sync/status", get(handle))
            .with_state(state)
    }

    #[tokio::test]
    async fn it_should_report_primed_cursors_after_a_run() {
        let fixture = in_memory_app();
        fixture
            .state
            .sync_runner
            .run(RunCatalogSync::full().only(&[EntityType::Items]))
            .await
            .expect("run failed");

        let response = app(fixture.state)
            .oneshot(Request::get("/sync/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let entities = json["entities"].as_array().expect("no entities");
        assert_eq!(entities.len(), 6);
        assert_eq!(entities[2]["entity"], "items");
        assert_eq!(entities[2]["cursor"], "primed");
        assert_eq!(entities[2]["cursor_version"], 1);
        assert_eq!(entities[2]["running_run_id"], serde_json::Value::Null);
        assert_eq!(entities[3]["cursor"], "fresh");
    }

    #[tokio::test]
    async fn it_should_return_500_when_the_state_store_is_offline() {
        let mut sync_state = InMemorySyncState::new();
        sync_state.toggle_offline();
        let fixture = in_memory_app_with(
            InMemoryCatalogSource::new(),
            InMemoryCatalogStore::new(),
            sync_state,
        );
        let response = app(fixture.state)
            .oneshot(Request::get("/sync/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
