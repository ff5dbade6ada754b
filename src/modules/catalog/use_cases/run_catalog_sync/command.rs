use crate::modules::catalog::core::cursor::SyncMode;
use crate::modules::catalog::core::entity::EntityType;

/// Request to reconcile the local catalog against upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCatalogSync {
    pub mode: SyncMode,
    /// Entity types to cover; empty means all of them.
    pub entities: Vec<EntityType>,
}

impl RunCatalogSync {
    pub fn full() -> Self {
        Self {
            mode: SyncMode::Full,
            entities: Vec::new(),
        }
    }

    pub fn incremental() -> Self {
        Self {
            mode: SyncMode::Incremental,
            entities: Vec::new(),
        }
    }

    pub fn only(mut self, entities: &[EntityType]) -> Self {
        self.entities = entities.to_vec();
        self
    }
}
