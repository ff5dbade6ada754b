// Mapper turns raw upstream records into normalized rows.
//
// Purpose
// - Validate payloads at the boundary so the write path only ever sees typed rows.
//
// Responsibilities
// - Tolerate missing optional fields by mapping them to explicit sentinels.
// - Absorb known schema drift between the POS export and the live API.
// - Reject a single malformed record without failing the rest of its page.

use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::rows::{
    CategoryRow, InventoryCountRow, ItemRow, LocationRow, LocationStatus, NormalizedRow,
    VariationRow, VendorInfoRow,
};
use crate::modules::catalog::core::sku::Sku;
use crate::shared::core::primitives::{Money, Reported};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

const DEFAULT_CURRENCY: &str = "USD";
const IN_STOCK: &str = "IN_STOCK";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("skipped {entity} record {}: {reason}", .external_id.as_deref().unwrap_or("<no id>"))]
pub struct MappingSkipped {
    pub entity: EntityType,
    pub external_id: Option<String>,
    pub reason: String,
}

impl MappingSkipped {
    fn new(entity: EntityType, external_id: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            entity,
            external_id: external_id.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// Rows produced by one raw record, plus nested entries that had to be dropped.
#[derive(Debug, Default, PartialEq)]
pub struct MappedRecord {
    pub rows: Vec<NormalizedRow>,
    pub dropped: Vec<MappingSkipped>,
}

#[derive(Debug, Default, PartialEq)]
pub struct MappedPage {
    pub rows: Vec<NormalizedRow>,
    pub skipped: Vec<MappingSkipped>,
}

pub fn map_page(entity: EntityType, records: &[Value]) -> MappedPage {
    let mut page = MappedPage::default();
    for record in records {
        match map_record(entity, record) {
            Ok(mapped) => {
                page.rows.extend(mapped.rows);
                page.skipped.extend(mapped.dropped);
            }
            Err(skipped) => page.skipped.push(skipped),
        }
    }
    for skipped in &page.skipped {
        tracing::warn!(
            entity = %skipped.entity,
            external_id = skipped.external_id.as_deref().unwrap_or(""),
            reason = %skipped.reason,
            "record skipped during mapping"
        );
    }
    page
}

pub fn map_record(entity: EntityType, record: &Value) -> Result<MappedRecord, MappingSkipped> {
    if !record.is_object() {
        return Err(MappingSkipped::new(entity, None, "record is not an object"));
    }
    match entity {
        EntityType::Locations => map_location(record).map(single),
        EntityType::Categories => map_category(record).map(single),
        EntityType::Items => map_item(record).map(single),
        EntityType::Variations => map_variation(record),
        EntityType::Inventory => map_inventory(record).map(|row| MappedRecord {
            rows: row.into_iter().collect(),
            dropped: Vec::new(),
        }),
        EntityType::VendorInfo => {
            let object = parse_object(entity, record)?;
            map_vendor_info(&object, None).map(single)
        }
    }
}

fn single(row: NormalizedRow) -> MappedRecord {
    MappedRecord {
        rows: vec![row],
        dropped: Vec::new(),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawMoney {
    amount: Option<RawNumber>,
    currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn as_i64(&self) -> Option<i64> {
        match self {
            RawNumber::Int(v) => Some(*v),
            RawNumber::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            RawNumber::Float(_) => None,
            RawNumber::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            RawNumber::Int(v) => Some(Decimal::from(*v)),
            RawNumber::Float(v) => Decimal::try_from(*v).ok(),
            RawNumber::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIdRef {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCatalogObject {
    #[serde(rename = "type")]
    object_type: Option<String>,
    id: Option<String>,
    updated_at: Option<String>,
    is_deleted: Option<bool>,
    present_at_all_locations: Option<bool>,
    present_at_location_ids: Option<Vec<String>>,
    absent_at_location_ids: Option<Vec<String>>,
    category_data: Option<RawCategoryData>,
    item_data: Option<RawItemData>,
    item_variation_data: Option<RawVariationData>,
    item_variation_vendor_info_data: Option<RawVendorInfoData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCategoryData {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawItemData {
    name: Option<String>,
    category_id: Option<String>,
    categories: Option<Vec<RawIdRef>>,
    reporting_category: Option<RawIdRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVariationData {
    item_id: Option<String>,
    name: Option<String>,
    sku: Option<String>,
    price_money: Option<RawMoney>,
    #[serde(alias = "unit_cost")]
    default_unit_cost: Option<RawMoney>,
    item_variation_vendor_infos: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVendorInfoData {
    item_variation_id: Option<String>,
    vendor_id: Option<String>,
    sku: Option<String>,
    price_money: Option<RawMoney>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLocation {
    id: Option<String>,
    name: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInventoryCount {
    catalog_object_id: Option<String>,
    location_id: Option<String>,
    state: Option<String>,
    quantity: Option<RawNumber>,
    calculated_at: Option<String>,
}

fn expected_object_type(entity: EntityType) -> Option<&'static str> {
    match entity {
        EntityType::Categories => Some("CATEGORY"),
        EntityType::Items => Some("ITEM"),
        EntityType::Variations => Some("ITEM_VARIATION"),
        EntityType::VendorInfo => Some("ITEM_VARIATION_VENDOR_INFO"),
        EntityType::Locations | EntityType::Inventory => None,
    }
}

fn parse_object(entity: EntityType, record: &Value) -> Result<RawCatalogObject, MappingSkipped> {
    let id_hint = record.get("id").and_then(Value::as_str);
    let object = RawCatalogObject::deserialize(record)
        .map_err(|e| MappingSkipped::new(entity, id_hint, format!("malformed payload: {e}")))?;
    if let (Some(expected), Some(actual)) = (expected_object_type(entity), &object.object_type) {
        if actual != expected {
            return Err(MappingSkipped::new(
                entity,
                id_hint,
                format!("unexpected object type {actual}"),
            ));
        }
    }
    Ok(object)
}

fn required(
    entity: EntityType,
    external_id: Option<&str>,
    value: Option<String>,
    field: &str,
) -> Result<String, MappingSkipped> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MappingSkipped::new(entity, external_id, format!("missing {field}")))
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn map_money(
    entity: EntityType,
    external_id: Option<&str>,
    raw: Option<RawMoney>,
    field: &str,
) -> Result<Reported<Money>, MappingSkipped> {
    let Some(RawMoney { amount, currency }) = raw else {
        return Ok(Reported::Unknown);
    };
    let Some(amount) = amount else {
        return Ok(Reported::Unknown);
    };
    let amount = amount.as_i64().ok_or_else(|| {
        MappingSkipped::new(entity, external_id, format!("unparsable {field} amount"))
    })?;
    let currency = currency
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    Ok(Reported::Known(Money::new(amount, currency)))
}

fn map_location(record: &Value) -> Result<NormalizedRow, MappingSkipped> {
    let entity = EntityType::Locations;
    let id_hint = record.get("id").and_then(Value::as_str);
    let raw = RawLocation::deserialize(record)
        .map_err(|e| MappingSkipped::new(entity, id_hint, format!("malformed payload: {e}")))?;
    let external_id = required(entity, id_hint, raw.id, "id")?;
    Ok(NormalizedRow::Location(LocationRow {
        name: raw.name.unwrap_or_default(),
        status: raw
            .status
            .as_deref()
            .map(LocationStatus::parse)
            .unwrap_or(LocationStatus::Inactive),
        archived: false,
        external_id,
    }))
}

fn map_category(record: &Value) -> Result<NormalizedRow, MappingSkipped> {
    let entity = EntityType::Categories;
    let object = parse_object(entity, record)?;
    let external_id = required(entity, None, object.id, "id")?;
    Ok(NormalizedRow::Category(CategoryRow {
        name: object
            .category_data
            .and_then(|d| d.name)
            .unwrap_or_default(),
        archived: object.is_deleted.unwrap_or(false),
        updated_at: parse_timestamp(object.updated_at.as_deref()),
        external_id,
    }))
}

fn map_item(record: &Value) -> Result<NormalizedRow, MappingSkipped> {
    let entity = EntityType::Items;
    let object = parse_object(entity, record)?;
    let external_id = required(entity, None, object.id, "id")?;
    let data = object.item_data.unwrap_or_default();
    let category_ref = data
        .category_id
        .or_else(|| data.categories.into_iter().flatten().find_map(|c| c.id))
        .or_else(|| data.reporting_category.and_then(|c| c.id))
        .filter(|c| !c.trim().is_empty());
    Ok(NormalizedRow::Item(ItemRow {
        name: data.name.unwrap_or_default(),
        category_ref,
        archived: object.is_deleted.unwrap_or(false),
        updated_at: parse_timestamp(object.updated_at.as_deref()),
        external_id,
    }))
}

fn map_variation(record: &Value) -> Result<MappedRecord, MappingSkipped> {
    let entity = EntityType::Variations;
    let object = parse_object(entity, record)?;
    let external_id = required(entity, None, object.id, "id")?;
    let id = Some(external_id.as_str());
    let data = object.item_variation_data.unwrap_or_default();
    let item_ref = required(entity, id, data.item_id, "item_id")?;
    let price = map_money(entity, id, data.price_money, "price")?;
    let unit_cost = map_money(entity, id, data.default_unit_cost, "unit cost")?;

    let mut mapped = MappedRecord::default();
    for embedded in data.item_variation_vendor_infos.iter().flatten() {
        let vendor = parse_object(EntityType::VendorInfo, embedded)
            .and_then(|object| map_vendor_info(&object, Some(&external_id)));
        match vendor {
            Ok(row) => mapped.rows.push(row),
            Err(skipped) => mapped.dropped.push(skipped),
        }
    }

    let variation = NormalizedRow::Variation(VariationRow {
        item_ref,
        name: data.name.unwrap_or_default(),
        sku: Sku::classify(data.sku.as_deref()),
        price,
        unit_cost,
        present_at_all_locations: object.present_at_all_locations.unwrap_or(true),
        present_at_location_ids: object.present_at_location_ids.unwrap_or_default(),
        absent_at_location_ids: object.absent_at_location_ids.unwrap_or_default(),
        archived: object.is_deleted.unwrap_or(false),
        updated_at: parse_timestamp(object.updated_at.as_deref()),
        external_id,
    });
    mapped.rows.insert(0, variation);
    Ok(mapped)
}

fn map_vendor_info(
    object: &RawCatalogObject,
    parent_variation: Option<&str>,
) -> Result<NormalizedRow, MappingSkipped> {
    let entity = EntityType::VendorInfo;
    let id = object.id.as_deref();
    let data = object
        .item_variation_vendor_info_data
        .as_ref()
        .ok_or_else(|| MappingSkipped::new(entity, id, "missing vendor info data"))?;
    let variation_ref = required(
        entity,
        id,
        data.item_variation_id
            .clone()
            .or_else(|| parent_variation.map(str::to_string)),
        "item_variation_id",
    )?;
    let vendor_ref = required(entity, id, data.vendor_id.clone(), "vendor_id")?;
    let cost = map_money(entity, id, data.price_money.clone(), "vendor cost")?;
    Ok(NormalizedRow::VendorInfo(VendorInfoRow {
        variation_ref,
        vendor_ref,
        vendor_sku: data
            .sku
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .into(),
        cost,
        archived: object.is_deleted.unwrap_or(false),
    }))
}

fn map_inventory(record: &Value) -> Result<Option<NormalizedRow>, MappingSkipped> {
    let entity = EntityType::Inventory;
    let id_hint = record.get("catalog_object_id").and_then(Value::as_str);
    let raw = RawInventoryCount::deserialize(record)
        .map_err(|e| MappingSkipped::new(entity, id_hint, format!("malformed payload: {e}")))?;
    if raw.state.as_deref().is_some_and(|s| s != IN_STOCK) {
        return Ok(None);
    }
    let variation_ref = required(entity, id_hint, raw.catalog_object_id, "catalog_object_id")?;
    let location_ref = required(entity, id_hint, raw.location_id, "location_id")?;
    let quantity = raw
        .quantity
        .ok_or_else(|| MappingSkipped::new(entity, id_hint, "missing quantity"))?
        .as_decimal()
        .ok_or_else(|| MappingSkipped::new(entity, id_hint, "unparsable quantity"))?;
    Ok(Some(NormalizedRow::Inventory(InventoryCountRow {
        variation_ref,
        location_ref,
        quantity,
        calculated_at: parse_timestamp(raw.calculated_at.as_deref()),
        archived: false,
    })))
}
