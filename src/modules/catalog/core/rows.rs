use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::sku::Sku;
use crate::shared::core::primitives::{Money, Reported};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reconciliation key of a row within its entity type.
///
/// External id for most entities; `variation@location` for inventory counts and
/// `variation@vendor` for vendor info.
pub type RowKey = String;

pub fn composite_key(left: &str, right: &str) -> RowKey {
    format!("{left}@{right}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Active,
    Inactive,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationStatus::Active => "active",
            LocationStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> LocationStatus {
        if value.eq_ignore_ascii_case("active") {
            LocationStatus::Active
        } else {
            LocationStatus::Inactive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    pub external_id: String,
    pub name: String,
    pub status: LocationStatus,
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub external_id: String,
    pub name: String,
    pub archived: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub external_id: String,
    pub name: String,
    pub category_ref: Option<String>,
    pub archived: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationRow {
    pub external_id: String,
    pub item_ref: String,
    pub name: String,
    pub sku: Sku,
    pub price: Reported<Money>,
    pub unit_cost: Reported<Money>,
    pub present_at_all_locations: bool,
    pub present_at_location_ids: Vec<String>,
    pub absent_at_location_ids: Vec<String>,
    pub archived: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCountRow {
    pub variation_ref: String,
    pub location_ref: String,
    pub quantity: Decimal,
    pub calculated_at: Option<DateTime<Utc>>,
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorInfoRow {
    pub variation_ref: String,
    pub vendor_ref: String,
    pub vendor_sku: Reported<String>,
    pub cost: Reported<Money>,
    pub archived: bool,
}

/// One normalized, validated row ready for the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum NormalizedRow {
    Location(LocationRow),
    Category(CategoryRow),
    Item(ItemRow),
    Variation(VariationRow),
    Inventory(InventoryCountRow),
    VendorInfo(VendorInfoRow),
}

impl NormalizedRow {
    pub fn entity(&self) -> EntityType {
        match self {
            NormalizedRow::Location(_) => EntityType::Locations,
            NormalizedRow::Category(_) => EntityType::Categories,
            NormalizedRow::Item(_) => EntityType::Items,
            NormalizedRow::Variation(_) => EntityType::Variations,
            NormalizedRow::Inventory(_) => EntityType::Inventory,
            NormalizedRow::VendorInfo(_) => EntityType::VendorInfo,
        }
    }

    pub fn key(&self) -> RowKey {
        match self {
            NormalizedRow::Location(r) => r.external_id.clone(),
            NormalizedRow::Category(r) => r.external_id.clone(),
            NormalizedRow::Item(r) => r.external_id.clone(),
            NormalizedRow::Variation(r) => r.external_id.clone(),
            NormalizedRow::Inventory(r) => composite_key(&r.variation_ref, &r.location_ref),
            NormalizedRow::VendorInfo(r) => composite_key(&r.variation_ref, &r.vendor_ref),
        }
    }

    /// Rows that must already exist locally before this one may be written.
    pub fn parent_refs(&self) -> Vec<(EntityType, &str)> {
        match self {
            NormalizedRow::Variation(r) => vec![(EntityType::Items, r.item_ref.as_str())],
            NormalizedRow::Inventory(r) => vec![
                (EntityType::Variations, r.variation_ref.as_str()),
                (EntityType::Locations, r.location_ref.as_str()),
            ],
            NormalizedRow::VendorInfo(r) => {
                vec![(EntityType::Variations, r.variation_ref.as_str())]
            }
            _ => Vec::new(),
        }
    }

    pub fn is_archived(&self) -> bool {
        match self {
            NormalizedRow::Location(r) => r.archived,
            NormalizedRow::Category(r) => r.archived,
            NormalizedRow::Item(r) => r.archived,
            NormalizedRow::Variation(r) => r.archived,
            NormalizedRow::Inventory(r) => r.archived,
            NormalizedRow::VendorInfo(r) => r.archived,
        }
    }

    pub fn set_archived(&mut self, archived: bool) {
        match self {
            NormalizedRow::Location(r) => r.archived = archived,
            NormalizedRow::Category(r) => r.archived = archived,
            NormalizedRow::Item(r) => r.archived = archived,
            NormalizedRow::Variation(r) => r.archived = archived,
            NormalizedRow::Inventory(r) => r.archived = archived,
            NormalizedRow::VendorInfo(r) => r.archived = archived,
        }
    }
}
