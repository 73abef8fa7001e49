//! Durable migration progress
//!
//! The store is a flat view over hierarchical keys (see
//! [`scanner_migration_types::CheckpointKey`]). Every `set` is durable before
//! it returns and keys are written independently, so a crash between writes
//! can only under-report progress.

pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use scanner_migration_types::{Address, ChainId, CheckpointKey, GroupKey, PoolId};

use crate::error::{MigratorError, MigratorResult};

pub use json_file::JsonFileCheckpointStore;
pub use memory::MemoryCheckpointStore;

/// Checkpoint port
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    async fn get(&self, key: &str) -> MigratorResult<Option<Value>>;

    /// Write a value; durable once this returns
    async fn set(&self, key: &str, value: Value) -> MigratorResult<()>;
}

/// Typed accessors for the keys the migrator writes
#[async_trait]
pub trait CheckpointStoreExt: CheckpointStore {
    async fn pool_id(&self, group: &GroupKey) -> MigratorResult<Option<PoolId>> {
        let key = CheckpointKey::pool_id(group);
        match self.get(&key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let pool_id: PoolId = serde_json::from_value(value).map_err(|e| {
                    MigratorError::Checkpoint(format!("unreadable pool id at {}: {}", key, e))
                })?;
                Ok((!pool_id.is_none()).then_some(pool_id))
            }
        }
    }

    async fn set_pool_id(&self, group: &GroupKey, pool_id: PoolId) -> MigratorResult<()> {
        if pool_id.is_none() {
            return Err(MigratorError::Checkpoint(format!(
                "refusing to cache sentinel pool id for {}",
                group
            )));
        }
        self.set(&CheckpointKey::pool_id(group), serde_json::to_value(pool_id)?).await
    }

    async fn is_migrated(&self, chain_id: ChainId, owner: &Address, id: &Address) -> MigratorResult<bool> {
        let key = CheckpointKey::record_migrated(chain_id, owner, id);
        Ok(matches!(self.get(&key).await?, Some(Value::Bool(true))))
    }

    async fn mark_migrated(&self, chain_id: ChainId, owner: &Address, id: &Address) -> MigratorResult<()> {
        let key = CheckpointKey::record_migrated(chain_id, owner, id);
        self.set(&key, Value::Bool(true)).await
    }
}

impl<T: CheckpointStore + ?Sized> CheckpointStoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_typed_accessors() {
        let store = MemoryCheckpointStore::new();
        let group = GroupKey::new("0xA", 137);
        let scanner = Address::new("0xS1");

        assert_eq!(store.pool_id(&group).await.unwrap(), None);
        assert!(!store.is_migrated(group.chain_id, &group.owner, &scanner).await.unwrap());

        store.set_pool_id(&group, PoolId(7)).await.unwrap();
        store.mark_migrated(group.chain_id, &group.owner, &scanner).await.unwrap();

        assert_eq!(store.pool_id(&group).await.unwrap(), Some(PoolId(7)));
        assert!(store.is_migrated(group.chain_id, &group.owner, &scanner).await.unwrap());
        assert_eq!(
            store.get("137.0xa.records.0xs1.migrated").await.unwrap(),
            Some(Value::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_sentinel_pool_is_never_cached() {
        let store = MemoryCheckpointStore::new();
        let group = GroupKey::new("0xA", 137);
        assert!(store.set_pool_id(&group, PoolId::NONE).await.is_err());

        // A legacy document holding "0" reads as no pool
        store.set("137.0xa.poolId", Value::String("0".into())).await.unwrap();
        assert_eq!(store.pool_id(&group).await.unwrap(), None);
    }
}
