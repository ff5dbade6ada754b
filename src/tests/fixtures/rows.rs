use crate::modules::catalog::core::rows::{
    InventoryCountRow, ItemRow, LocationRow, LocationStatus, VariationRow, VendorInfoRow,
};
use crate::modules::catalog::core::sku::Sku;
use crate::shared::core::primitives::{Money, Reported};
use rust_decimal::Decimal;

pub fn location_row(external_id: &str) -> LocationRow {
    LocationRow {
        external_id: external_id.to_string(),
        name: format!("Store {external_id}"),
        status: LocationStatus::Active,
        archived: false,
    }
}

pub fn item_row(external_id: &str, name: &str) -> ItemRow {
    ItemRow {
        external_id: external_id.to_string(),
        name: name.to_string(),
        category_ref: None,
        archived: false,
        updated_at: None,
    }
}

pub fn variation_row(external_id: &str, item_ref: &str, price: i64) -> VariationRow {
    VariationRow {
        external_id: external_id.to_string(),
        item_ref: item_ref.to_string(),
        name: "Regular".to_string(),
        sku: Sku::Assigned(format!("SKU-{external_id}")),
        price: Reported::Known(Money::new(price, "USD")),
        unit_cost: Reported::Unknown,
        present_at_all_locations: true,
        present_at_location_ids: Vec::new(),
        absent_at_location_ids: Vec::new(),
        archived: false,
        updated_at: None,
    }
}

pub fn inventory_row(variation_ref: &str, location_ref: &str, quantity: i64) -> InventoryCountRow {
    InventoryCountRow {
        variation_ref: variation_ref.to_string(),
        location_ref: location_ref.to_string(),
        quantity: Decimal::from(quantity),
        calculated_at: None,
        archived: false,
    }
}

pub fn vendor_info_row(variation_ref: &str, vendor_ref: &str) -> VendorInfoRow {
    VendorInfoRow {
        variation_ref: variation_ref.to_string(),
        vendor_ref: vendor_ref.to_string(),
        vendor_sku: Reported::Known(format!("VSKU-{variation_ref}")),
        cost: Reported::Unknown,
        archived: false,
    }
}
