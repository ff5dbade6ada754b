// Raw upstream payloads shaped like the POS catalog API.

use serde_json::{Value, json};

/// Timestamp old enough to fall outside any incremental window in tests.
pub const LONG_AGO: &str = "2025-03-01T05:00:00Z";

pub fn location_record(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": "ACTIVE"
    })
}

pub fn category_record(id: &str, name: &str) -> Value {
    json!({
        "type": "CATEGORY",
        "id": id,
        "updated_at": LONG_AGO,
        "is_deleted": false,
        "category_data": {"name": name}
    })
}

pub fn item_record(id: &str, name: &str, category_id: Option<&str>) -> Value {
    json!({
        "type": "ITEM",
        "id": id,
        "updated_at": LONG_AGO,
        "is_deleted": false,
        "item_data": {
            "name": name,
            "category_id": category_id
        }
    })
}

pub fn variation_record(id: &str, item_id: &str, price: i64, sku: Option<&str>) -> Value {
    json!({
        "type": "ITEM_VARIATION",
        "id": id,
        "updated_at": LONG_AGO,
        "is_deleted": false,
        "present_at_all_locations": false,
        "present_at_location_ids": ["LOC-1"],
        "item_variation_data": {
            "item_id": item_id,
            "name": "Regular",
            "sku": sku,
            "price_money": {"amount": price, "currency": "USD"}
        }
    })
}

pub fn vendor_info_record(id: &str, variation_id: &str, vendor_id: &str, cost: Option<i64>) -> Value {
    json!({
        "type": "ITEM_VARIATION_VENDOR_INFO",
        "id": id,
        "updated_at": LONG_AGO,
        "item_variation_vendor_info_data": {
            "item_variation_id": variation_id,
            "vendor_id": vendor_id,
            "sku": format!("VSKU-{variation_id}"),
            "price_money": cost.map(|amount| json!({"amount": amount, "currency": "USD"}))
        }
    })
}

pub fn inventory_record(variation_id: &str, location_id: &str, quantity: &str) -> Value {
    json!({
        "catalog_object_id": variation_id,
        "catalog_object_type": "ITEM_VARIATION",
        "location_id": location_id,
        "state": "IN_STOCK",
        "quantity": quantity,
        "calculated_at": LONG_AGO
    })
}

/// Stamps a record as changed at `at`, on whichever timestamp field it carries.
pub fn touched(mut record: Value, at: chrono::DateTime<chrono::Utc>) -> Value {
    let field = if record.get("calculated_at").is_some() {
        "calculated_at"
    } else {
        "updated_at"
    };
    record[field] = json!(at.to_rfc3339());
    record
}
