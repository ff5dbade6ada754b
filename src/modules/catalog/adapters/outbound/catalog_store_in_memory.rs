// In memory catalog store and catalog queries.
//
// Purpose
// - Exercise the sync handler without a database.
//
// Responsibilities
// - Keep one map per entity type keyed by row key.
// - Apply a page all-or-nothing by staging it on a copy of the tables.
// - Simulate an offline backend or a failure on a chosen page.

use crate::modules::catalog::adapters::outbound::catalog_store::{
    CatalogStore, PageWrite, StoreError, in_write_order,
};
use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::rows::{NormalizedRow, RowKey};
use crate::modules::catalog::core::summary::WriteCounts;
use crate::modules::catalog::use_cases::find_catalog_item::projection::CatalogItemView;
use crate::modules::catalog::use_cases::find_catalog_item::queries_port::CatalogQueries;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

type Tables = HashMap<EntityType, BTreeMap<RowKey, NormalizedRow>>;

#[derive(Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<Tables>,
    is_offline: bool,
    page_calls: AtomicUsize,
    fail_on_page_call: AtomicUsize,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Makes the `n`-th `upsert_page` call (1-based, counted from now on) roll back.
    pub fn fail_on_page_call(&self, n: usize) {
        let next = self.page_calls.load(Ordering::SeqCst);
        self.fail_on_page_call.store(next + n, Ordering::SeqCst);
    }

    pub async fn get(&self, entity: EntityType, key: &str) -> Option<NormalizedRow> {
        self.tables
            .read()
            .await
            .get(&entity)
            .and_then(|table| table.get(key))
            .cloned()
    }

    pub async fn rows(&self, entity: EntityType) -> Vec<NormalizedRow> {
        self.tables
            .read()
            .await
            .get(&entity)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn snapshot(&self) -> BTreeMap<EntityType, BTreeMap<RowKey, NormalizedRow>> {
        self.tables
            .read()
            .await
            .iter()
            .map(|(entity, table)| (*entity, table.clone()))
            .collect()
    }
}

fn has_parents(tables: &Tables, row: &NormalizedRow) -> bool {
    row.parent_refs().into_iter().all(|(entity, key)| {
        tables
            .get(&entity)
            .is_some_and(|table| table.contains_key(key))
    })
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn upsert_page(&self, rows: &[NormalizedRow]) -> Result<PageWrite, StoreError> {
        let call = self.page_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_offline {
            return Err(StoreError::Backend("Catalog store offline".into()));
        }

        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let mut write = PageWrite::default();
        for row in in_write_order(rows) {
            let entity = row.entity();
            let mut counts = WriteCounts::default();
            if !has_parents(&staged, row) {
                counts.orphaned += 1;
                tracing::warn!(%entity, key = %row.key(), "parent row unknown, row not written");
                write.record(entity, counts);
                continue;
            }
            let table = staged.entry(entity).or_default();
            match table.get(&row.key()) {
                None => counts.inserted += 1,
                Some(existing) if existing == row => counts.unchanged += 1,
                Some(_) => counts.updated += 1,
            }
            if counts.unchanged == 0 {
                table.insert(row.key(), row.clone());
            }
            write.record(entity, counts);
        }

        if self.fail_on_page_call.load(Ordering::SeqCst) == call {
            return Err(StoreError::Backend(format!(
                "simulated failure on page call {call}"
            )));
        }
        *tables = staged;
        Ok(write)
    }

    async fn archive_missing(
        &self,
        entity: EntityType,
        seen: &HashSet<RowKey>,
    ) -> Result<u64, StoreError> {
        if self.is_offline {
            return Err(StoreError::Backend("Catalog store offline".into()));
        }

        let mut tables = self.tables.write().await;
        let mut archived = 0;
        if let Some(table) = tables.get_mut(&entity) {
            for (key, row) in table.iter_mut() {
                if !row.is_archived() && !seen.contains(key) {
                    row.set_archived(true);
                    archived += 1;
                }
            }
        }
        Ok(archived)
    }
}

#[async_trait::async_trait]
impl CatalogQueries for InMemoryCatalogStore {
    async fn find_item(&self, external_id: &str) -> anyhow::Result<Option<CatalogItemView>> {
        if self.is_offline {
            return Err(anyhow::anyhow!("Catalog store offline"));
        }

        let tables = self.tables.read().await;
        let Some(NormalizedRow::Item(item)) = tables
            .get(&EntityType::Items)
            .and_then(|table| table.get(external_id))
            .cloned()
        else {
            return Ok(None);
        };
        let variations = tables
            .get(&EntityType::Variations)
            .map(|table| {
                table
                    .values()
                    .filter_map(|row| match row {
                        NormalizedRow::Variation(v) if v.item_ref == external_id => Some(v.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(CatalogItemView::from_rows(item, variations)))
    }
}
