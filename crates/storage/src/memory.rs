//! In-memory repository, for tests and embedding.

use std::collections::HashMap;
use optrack_core::{PartNumber, WorkItem};
use tokio::sync::RwLock;
use super::trait_::check_version;
use super::{Repository, Result, Versioned};

/// Work items held in a map, versioned like the file store.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<PartNumber, Versioned<WorkItem>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Repository for MemoryStorage {
    async fn load_item(&self, part_number: &PartNumber) -> Result<Option<Versioned<WorkItem>>> {
        Ok(self.items.read().await.get(part_number).cloned())
    }

    async fn save_item(&self, item: &WorkItem, expected_version: Option<u64>) -> Result<u64> {
        let mut items = self.items.write().await;
        let actual = items.get(&item.part_number).map(|v| v.version);
        let version = check_version(&item.part_number, expected_version, actual)?;
        items.insert(
            item.part_number.clone(),
            Versioned {
                value: item.clone(),
                version,
            },
        );
        Ok(version)
    }

    async fn list_items(&self) -> Result<Vec<WorkItem>> {
        let mut items: Vec<WorkItem> = self
            .items
            .read()
            .await
            .values()
            .map(|v| v.value.clone())
            .collect();
        items.sort_by(|a, b| a.part_number.cmp(&b.part_number));
        Ok(items)
    }
}
