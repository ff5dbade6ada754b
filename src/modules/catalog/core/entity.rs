use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity types reconciled by a sync run, declared in foreign-key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Locations,
    Categories,
    Items,
    Variations,
    Inventory,
    VendorInfo,
}

impl EntityType {
    /// Order in which a run visits entity types. Parents always precede children.
    pub const SYNC_ORDER: [EntityType; 6] = [
        EntityType::Locations,
        EntityType::Categories,
        EntityType::Items,
        EntityType::Variations,
        EntityType::Inventory,
        EntityType::VendorInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Locations => "locations",
            EntityType::Categories => "categories",
            EntityType::Items => "items",
            EntityType::Variations => "variations",
            EntityType::Inventory => "inventory",
            EntityType::VendorInfo => "vendor_info",
        }
    }

    /// Whether the upstream can answer "changes since" for this entity type.
    pub fn supports_incremental(&self) -> bool {
        !matches!(self, EntityType::Locations)
    }

    /// Sorts and deduplicates a requested subset into sync order.
    /// An empty request means every entity type.
    pub fn ordered(requested: &[EntityType]) -> Vec<EntityType> {
        if requested.is_empty() {
            return Self::SYNC_ORDER.to_vec();
        }
        let mut entities = requested.to_vec();
        entities.sort();
        entities.dedup();
        entities
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SYNC_ORDER
            .into_iter()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| UnknownEntityType(s.to_string()))
    }
}
