use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{Extension, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

use catalog_sync::modules::catalog::adapters::outbound::catalog_source_http::HttpCatalogSource;
use catalog_sync::modules::catalog::adapters::outbound::catalog_store_postgres::PostgresCatalogStore;
use catalog_sync::modules::catalog::adapters::outbound::sync_state_postgres::PostgresSyncState;
use catalog_sync::modules::catalog::use_cases::run_catalog_sync::handler::RunCatalogSyncHandler;
use catalog_sync::shared::infrastructure::postgres;
use catalog_sync::shell::config::AppConfig;
use catalog_sync::shell::graphql::{AppSchema, AppState, schema};
use catalog_sync::shell::http::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env()?;

    let pool = postgres::connect(&config.database_url, config.database_max_connections).await?;
    postgres::migrate(&pool).await?;

    let source = Arc::new(HttpCatalogSource::new(&config.pos_api)?);
    let store = Arc::new(PostgresCatalogStore::new(pool.clone()));
    let sync_state = Arc::new(PostgresSyncState::new(pool));

    let sync_runner = Arc::new(RunCatalogSyncHandler::new(
        source,
        store.clone(),
        sync_state.clone(),
        config.sync,
    ));

    let state = AppState {
        sync_runner,
        sync_state,
        queries: store,
    };

    let app = router(state.clone())
        .route("/gql", get(graphiql).post(graphql))
        .layer(Extension(schema(state)))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}, GraphQL at /gql", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn graphql(Extension(schema): Extension<AppSchema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> axum::response::Html<String> {
    use async_graphql::http::GraphiQLSource;
    axum::response::Html(GraphiQLSource::build().endpoint("/gql").finish())
}
