use crate::modules::catalog::core::rows::{ItemRow, VariationRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationView {
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemView {
    pub external_id: String,
    pub name: String,
    pub category_ref: Option<String>,
    pub archived: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub variations: Vec<VariationView>,
}

impl From<VariationRow> for VariationView {
    fn from(row: VariationRow) -> Self {
        let price = row.price.into_option();
        let unit_cost = row.unit_cost.into_option();
        Self {
            sku_origin: row.sku.origin().to_string(),
            sku: row.sku.code().map(str::to_string),
            price_amount: price.as_ref().map(|m| m.amount),
            price_currency: price.map(|m| m.currency),
            unit_cost_amount: unit_cost.as_ref().map(|m| m.amount),
            unit_cost_currency: unit_cost.map(|m| m.currency),
            external_id: row.external_id,
            name: row.name,
            archived: row.archived,
        }
    }
}

impl CatalogItemView {
    pub fn from_rows(item: ItemRow, variations: Vec<VariationRow>) -> Self {
        Self {
            external_id: item.external_id,
            name: item.name,
            category_ref: item.category_ref,
            archived: item.archived,
            updated_at: item.updated_at,
            variations: variations.into_iter().map(VariationView::from).collect(),
        }
    }
}
