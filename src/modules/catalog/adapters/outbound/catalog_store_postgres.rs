// Postgres implementation of the CatalogStore port and catalog queries.
//
// Responsibilities
// - One transaction per page; rows written parents first.
// - Upserts only touch a row when a mutable column actually differs, so a
//   repeated sync reports rows as unchanged instead of updated.
// - Soft-delete by flipping `archived`; rows are never removed.

use crate::modules::catalog::adapters::outbound::catalog_store::{
    CatalogStore, PageWrite, StoreError, in_write_order,
};
use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::rows::{
    CategoryRow, InventoryCountRow, ItemRow, LocationRow, NormalizedRow, RowKey, VariationRow,
    VendorInfoRow,
};
use crate::modules::catalog::core::sku::Sku;
use crate::modules::catalog::core::summary::WriteCounts;
use crate::modules::catalog::use_cases::find_catalog_item::projection::CatalogItemView;
use crate::modules::catalog::use_cases::find_catalog_item::queries_port::CatalogQueries;
use crate::shared::core::primitives::{Money, Reported};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;

pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

/// Table and key expression matching `NormalizedRow::key` for an entity type.
fn table_of(entity: EntityType) -> (&'static str, &'static str) {
    match entity {
        EntityType::Locations => ("locations", "external_id"),
        EntityType::Categories => ("catalog_categories", "external_id"),
        EntityType::Items => ("catalog_items", "external_id"),
        EntityType::Variations => ("catalog_variations", "external_id"),
        EntityType::Inventory => ("inventory_counts", "variation_ref || '@' || location_ref"),
        EntityType::VendorInfo => ("vendor_infos", "variation_ref || '@' || vendor_ref"),
    }
}

fn money_parts(money: &Reported<Money>) -> (Option<i64>, Option<&str>) {
    match money.as_option() {
        Some(m) => (Some(m.amount), Some(m.currency.as_str())),
        None => (None, None),
    }
}

fn money_from(amount: Option<i64>, currency: Option<String>) -> Reported<Money> {
    amount
        .map(|amount| Money::new(amount, currency.unwrap_or_else(|| "USD".to_string())))
        .into()
}

async fn parent_exists(
    tx: &mut Transaction<'_, Postgres>,
    entity: EntityType,
    key: &str,
) -> Result<bool, StoreError> {
    let (table, _) = table_of(entity);
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE external_id = $1)");
    sqlx::query_scalar::<_, bool>(&sql)
        .bind(key)
        .fetch_one(&mut **tx)
        .await
        .map_err(backend)
}

/// `Some(true)` inserted, `Some(false)` updated, `None` left as is.
type UpsertOutcome = Option<bool>;

async fn upsert_location(
    tx: &mut Transaction<'_, Postgres>,
    row: &LocationRow,
) -> Result<UpsertOutcome, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO locations (external_id, name, status, archived) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (external_id) DO UPDATE SET \
           name = EXCLUDED.name, status = EXCLUDED.status, archived = EXCLUDED.archived, \
           synced_at = now() \
         WHERE (locations.name, locations.status, locations.archived) \
           IS DISTINCT FROM (EXCLUDED.name, EXCLUDED.status, EXCLUDED.archived) \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&row.external_id)
    .bind(&row.name)
    .bind(row.status.as_str())
    .bind(row.archived)
    .fetch_optional(&mut **tx)
    .await
}

async fn upsert_category(
    tx: &mut Transaction<'_, Postgres>,
    row: &CategoryRow,
) -> Result<UpsertOutcome, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO catalog_categories (external_id, name, archived, updated_at) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (external_id) DO UPDATE SET \
           name = EXCLUDED.name, archived = EXCLUDED.archived, updated_at = EXCLUDED.updated_at, \
           synced_at = now() \
         WHERE (catalog_categories.name, catalog_categories.archived, catalog_categories.updated_at) \
           IS DISTINCT FROM (EXCLUDED.name, EXCLUDED.archived, EXCLUDED.updated_at) \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&row.external_id)
    .bind(&row.name)
    .bind(row.archived)
    .bind(row.updated_at)
    .fetch_optional(&mut **tx)
    .await
}

async fn upsert_item(
    tx: &mut Transaction<'_, Postgres>,
    row: &ItemRow,
) -> Result<UpsertOutcome, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO catalog_items (external_id, name, category_ref, archived, updated_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (external_id) DO UPDATE SET \
           name = EXCLUDED.name, category_ref = EXCLUDED.category_ref, \
           archived = EXCLUDED.archived, updated_at = EXCLUDED.updated_at, synced_at = now() \
         WHERE (catalog_items.name, catalog_items.category_ref, catalog_items.archived, \
                catalog_items.updated_at) \
           IS DISTINCT FROM (EXCLUDED.name, EXCLUDED.category_ref, EXCLUDED.archived, \
                EXCLUDED.updated_at) \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&row.external_id)
    .bind(&row.name)
    .bind(&row.category_ref)
    .bind(row.archived)
    .bind(row.updated_at)
    .fetch_optional(&mut **tx)
    .await
}

async fn upsert_variation(
    tx: &mut Transaction<'_, Postgres>,
    row: &VariationRow,
) -> Result<UpsertOutcome, sqlx::Error> {
    let (price_amount, price_currency) = money_parts(&row.price);
    let (unit_cost_amount, unit_cost_currency) = money_parts(&row.unit_cost);
    sqlx::query_scalar(
        "INSERT INTO catalog_variations (external_id, item_ref, name, sku, sku_origin, \
           price_amount, price_currency, unit_cost_amount, unit_cost_currency, \
           present_at_all_locations, present_at_location_ids, absent_at_location_ids, \
           archived, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (external_id) DO UPDATE SET \
           item_ref = EXCLUDED.item_ref, name = EXCLUDED.name, sku = EXCLUDED.sku, \
           sku_origin = EXCLUDED.sku_origin, price_amount = EXCLUDED.price_amount, \
           price_currency = EXCLUDED.price_currency, \
           unit_cost_amount = EXCLUDED.unit_cost_amount, \
           unit_cost_currency = EXCLUDED.unit_cost_currency, \
           present_at_all_locations = EXCLUDED.present_at_all_locations, \
           present_at_location_ids = EXCLUDED.present_at_location_ids, \
           absent_at_location_ids = EXCLUDED.absent_at_location_ids, \
           archived = EXCLUDED.archived, updated_at = EXCLUDED.updated_at, synced_at = now() \
         WHERE (catalog_variations.item_ref, catalog_variations.name, catalog_variations.sku, \
                catalog_variations.sku_origin, catalog_variations.price_amount, \
                catalog_variations.price_currency, catalog_variations.unit_cost_amount, \
                catalog_variations.unit_cost_currency, \
                catalog_variations.present_at_all_locations, \
                catalog_variations.present_at_location_ids, \
                catalog_variations.absent_at_location_ids, catalog_variations.archived, \
                catalog_variations.updated_at) \
           IS DISTINCT FROM (EXCLUDED.item_ref, EXCLUDED.name, EXCLUDED.sku, \
                EXCLUDED.sku_origin, EXCLUDED.price_amount, EXCLUDED.price_currency, \
                EXCLUDED.unit_cost_amount, EXCLUDED.unit_cost_currency, \
                EXCLUDED.present_at_all_locations, EXCLUDED.present_at_location_ids, \
                EXCLUDED.absent_at_location_ids, EXCLUDED.archived, EXCLUDED.updated_at) \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&row.external_id)
    .bind(&row.item_ref)
    .bind(&row.name)
    .bind(row.sku.code())
    .bind(row.sku.origin())
    .bind(price_amount)
    .bind(price_currency)
    .bind(unit_cost_amount)
    .bind(unit_cost_currency)
    .bind(row.present_at_all_locations)
    .bind(&row.present_at_location_ids)
    .bind(&row.absent_at_location_ids)
    .bind(row.archived)
    .bind(row.updated_at)
    .fetch_optional(&mut **tx)
    .await
}

async fn upsert_inventory(
    tx: &mut Transaction<'_, Postgres>,
    row: &InventoryCountRow,
) -> Result<UpsertOutcome, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO inventory_counts (variation_ref, location_ref, quantity, calculated_at, archived) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (variation_ref, location_ref) DO UPDATE SET \
           quantity = EXCLUDED.quantity, calculated_at = EXCLUDED.calculated_at, \
           archived = EXCLUDED.archived, synced_at = now() \
         WHERE (inventory_counts.quantity, inventory_counts.calculated_at, inventory_counts.archived) \
           IS DISTINCT FROM (EXCLUDED.quantity, EXCLUDED.calculated_at, EXCLUDED.archived) \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&row.variation_ref)
    .bind(&row.location_ref)
    .bind(row.quantity)
    .bind(row.calculated_at)
    .bind(row.archived)
    .fetch_optional(&mut **tx)
    .await
}

async fn upsert_vendor_info(
    tx: &mut Transaction<'_, Postgres>,
    row: &VendorInfoRow,
) -> Result<UpsertOutcome, sqlx::Error> {
    let (cost_amount, cost_currency) = money_parts(&row.cost);
    sqlx::query_scalar(
        "INSERT INTO vendor_infos (variation_ref, vendor_ref, vendor_sku, cost_amount, \
           cost_currency, archived) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (variation_ref, vendor_ref) DO UPDATE SET \
           vendor_sku = EXCLUDED.vendor_sku, cost_amount = EXCLUDED.cost_amount, \
           cost_currency = EXCLUDED.cost_currency, archived = EXCLUDED.archived, \
           synced_at = now() \
         WHERE (vendor_infos.vendor_sku, vendor_infos.cost_amount, vendor_infos.cost_currency, \
                vendor_infos.archived) \
           IS DISTINCT FROM (EXCLUDED.vendor_sku, EXCLUDED.cost_amount, \
                EXCLUDED.cost_currency, EXCLUDED.archived) \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&row.variation_ref)
    .bind(&row.vendor_ref)
    .bind(row.vendor_sku.as_option().map(String::as_str))
    .bind(cost_amount)
    .bind(cost_currency)
    .bind(row.archived)
    .fetch_optional(&mut **tx)
    .await
}

async fn upsert_row(
    tx: &mut Transaction<'_, Postgres>,
    row: &NormalizedRow,
) -> Result<UpsertOutcome, sqlx::Error> {
    match row {
        NormalizedRow::Location(r) => upsert_location(tx, r).await,
        NormalizedRow::Category(r) => upsert_category(tx, r).await,
        NormalizedRow::Item(r) => upsert_item(tx, r).await,
        NormalizedRow::Variation(r) => upsert_variation(tx, r).await,
        NormalizedRow::Inventory(r) => upsert_inventory(tx, r).await,
        NormalizedRow::VendorInfo(r) => upsert_vendor_info(tx, r).await,
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn upsert_page(&self, rows: &[NormalizedRow]) -> Result<PageWrite, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut write = PageWrite::default();
        for row in in_write_order(rows) {
            let entity = row.entity();
            let mut counts = WriteCounts::default();
            let mut parents_present = true;
            for (parent, key) in row.parent_refs() {
                if !parent_exists(&mut tx, parent, key).await? {
                    parents_present = false;
                    break;
                }
            }
            if !parents_present {
                counts.orphaned += 1;
                tracing::warn!(%entity, key = %row.key(), "parent row unknown, row not written");
                write.record(entity, counts);
                continue;
            }
            match upsert_row(&mut tx, row).await.map_err(backend)? {
                Some(true) => counts.inserted += 1,
                Some(false) => counts.updated += 1,
                None => counts.unchanged += 1,
            }
            write.record(entity, counts);
        }
        tx.commit().await.map_err(backend)?;
        Ok(write)
    }

    async fn archive_missing(
        &self,
        entity: EntityType,
        seen: &HashSet<RowKey>,
    ) -> Result<u64, StoreError> {
        let (table, key) = table_of(entity);
        let sql = format!(
            "UPDATE {table} SET archived = TRUE, synced_at = now() \
             WHERE archived = FALSE AND NOT ({key} = ANY($1))"
        );
        let keys: Vec<String> = seen.iter().cloned().collect();
        let result = sqlx::query(&sql)
            .bind(keys)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct ItemRecord {
    external_id: String,
    name: String,
    category_ref: Option<String>,
    archived: bool,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct VariationRecord {
    external_id: String,
    item_ref: String,
    name: String,
    sku: Option<String>,
    sku_origin: String,
    price_amount: Option<i64>,
    price_currency: Option<String>,
    unit_cost_amount: Option<i64>,
    unit_cost_currency: Option<String>,
    present_at_all_locations: bool,
    present_at_location_ids: Vec<String>,
    absent_at_location_ids: Vec<String>,
    archived: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ItemRecord> for ItemRow {
    fn from(r: ItemRecord) -> Self {
        Self {
            external_id: r.external_id,
            name: r.name,
            category_ref: r.category_ref,
            archived: r.archived,
            updated_at: r.updated_at,
        }
    }
}

impl From<VariationRecord> for VariationRow {
    fn from(r: VariationRecord) -> Self {
        Self {
            sku: Sku::from_parts(r.sku, &r.sku_origin),
            price: money_from(r.price_amount, r.price_currency),
            unit_cost: money_from(r.unit_cost_amount, r.unit_cost_currency),
            external_id: r.external_id,
            item_ref: r.item_ref,
            name: r.name,
            present_at_all_locations: r.present_at_all_locations,
            present_at_location_ids: r.present_at_location_ids,
            absent_at_location_ids: r.absent_at_location_ids,
            archived: r.archived,
            updated_at: r.updated_at,
        }
    }
}

#[async_trait::async_trait]
impl CatalogQueries for PostgresCatalogStore {
    async fn find_item(&self, external_id: &str) -> anyhow::Result<Option<CatalogItemView>> {
        let item: Option<ItemRecord> = sqlx::query_as(
            "SELECT external_id, name, category_ref, archived, updated_at \
             FROM catalog_items WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(item) = item else {
            return Ok(None);
        };

        let variations: Vec<VariationRecord> = sqlx::query_as(
            "SELECT external_id, item_ref, name, sku, sku_origin, price_amount, price_currency, \
               unit_cost_amount, unit_cost_currency, present_at_all_locations, \
               present_at_location_ids, absent_at_location_ids, archived, updated_at \
             FROM catalog_variations WHERE item_ref = $1 ORDER BY external_id",
        )
        .bind(external_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CatalogItemView::from_rows(
            item.into(),
            variations.into_iter().map(Into::into).collect(),
        )))
    }
}
