// Port for the local catalog tables.
//
// Purpose
// - Apply normalized rows idempotently and soft-delete rows a full sync no longer sees.
//
// Boundaries
// - One `upsert_page` call is one transaction: all rows land or none do.

use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::rows::{NormalizedRow, RowKey};
use crate::modules::catalog::core::summary::WriteCounts;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageWrite {
    pub per_entity: BTreeMap<EntityType, WriteCounts>,
}

impl PageWrite {
    pub fn record(&mut self, entity: EntityType, counts: WriteCounts) {
        *self.per_entity.entry(entity).or_default() += counts;
    }

    pub fn total(&self) -> WriteCounts {
        let mut total = WriteCounts::default();
        for counts in self.per_entity.values() {
            total += *counts;
        }
        total
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts or updates every row in one transaction, parents before children.
    async fn upsert_page(&self, rows: &[NormalizedRow]) -> Result<PageWrite, StoreError>;

    /// Marks every live row of `entity` whose key is not in `seen` as archived.
    async fn archive_missing(
        &self,
        entity: EntityType,
        seen: &HashSet<RowKey>,
    ) -> Result<u64, StoreError>;
}

/// Orders rows so parents are written before the children that reference them.
pub fn in_write_order(rows: &[NormalizedRow]) -> Vec<&NormalizedRow> {
    let mut ordered: Vec<&NormalizedRow> = rows.iter().collect();
    ordered.sort_by_key(|row| row.entity());
    ordered
}
