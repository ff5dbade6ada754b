use async_graphql::{Context, Object, Result as GqlResult, SimpleObject};
use chrono::{DateTime, Utc};

use crate::modules::catalog::use_cases::find_catalog_item::projection::{
    CatalogItemView, VariationView,
};
use crate::shell::state::AppState;

#[derive(SimpleObject, Clone)]
#[graphql(name = "CatalogVariation")]
pub struct GqlCatalogVariation {
    pub external_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub sku_origin: String,
    pub price_amount: Option<i64>,
    pub price_currency: Option<String>,
    pub unit_cost_amount: Option<i64>,
    pub unit_cost_currency: Option<String>,
    pub archived: bool,
}

#[derive(SimpleObject, Clone)]
#[graphql(name = "CatalogItem")]
pub struct GqlCatalogItem {
    pub external_id: String,
    pub name: String,
    pub category_ref: Option<String>,
    pub archived: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub variations: Vec<GqlCatalogVariation>,
}

impl From<VariationView> for GqlCatalogVariation {
    fn from(v: VariationView) -> Self {
        Self {
            external_id: v.external_id,
            name: v.name,
            sku: v.sku,
            sku_origin: v.sku_origin,
            price_amount: v.price_amount,
            price_currency: v.price_currency,
            unit_cost_amount: v.unit_cost_amount,
            unit_cost_currency: v.unit_cost_currency,
            archived: v.archived,
        }
    }
}

impl From<CatalogItemView> for GqlCatalogItem {
    fn from(v: CatalogItemView) -> Self {
        Self {
            external_id: v.external_id,
            name: v.name,
            category_ref: v.category_ref,
            archived: v.archived,
            updated_at: v.updated_at,
            variations: v.variations.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Default)]
pub struct CatalogItemQuery;

#[Object]
impl CatalogItemQuery {
    async fn catalog_item(
        &self,
        context: &Context<'_>,
        external_id: String,
    ) -> GqlResult<Option<GqlCatalogItem>> {
        let state = context.data_unchecked::<AppState>();
        let item = state.queries.find_item(&external_id).await?;
        Ok(item.map(Into::into))
    }
}
