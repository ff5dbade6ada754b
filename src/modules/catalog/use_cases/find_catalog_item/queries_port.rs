use crate::modules::catalog::use_cases::find_catalog_item::projection::CatalogItemView;
use async_trait::async_trait;

#[async_trait]
pub trait CatalogQueries {
    /// Looks an item up by external id, archived or not, with all of its variations.
    async fn find_item(&self, external_id: &str) -> anyhow::Result<Option<CatalogItemView>>;
}
