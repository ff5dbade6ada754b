use async_graphql::{EmptySubscription, MergedObject, Schema};

use crate::modules::catalog::use_cases::find_catalog_item::inbound::graphql::CatalogItemQuery;
use crate::modules::catalog::use_cases::get_sync_status::inbound::graphql::SyncStatusQuery;
pub use crate::modules::catalog::use_cases::run_catalog_sync::inbound::graphql::RunSyncMutation as MutationRoot;
pub use crate::shell::state::AppState;

#[derive(MergedObject, Default)]
pub struct QueryRoot(SyncStatusQuery, CatalogItemQuery);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn schema(state: AppState) -> AppSchema {
    Schema::build(QueryRoot::default(), MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}
