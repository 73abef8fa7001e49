//! In-process checkpoint store, used by tests and embedders

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::CheckpointStore;
use crate::error::MigratorResult;

#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, ordered by key
    pub async fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, key: &str) -> MigratorResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> MigratorResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
