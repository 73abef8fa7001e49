//! Checkpoint store backed by one JSON document per network
//!
//! Dotted keys map onto nested objects:
//! `137.0xa.records.0xs1.migrated` is stored as
//! `{"137": {"0xa": {"records": {"0xs1": {"migrated": true}}}}}`.
//! Every write replaces the document through a synced temporary file and a
//! rename, so a crash leaves either the previous or the new document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use scanner_migration_types::CheckpointKey;

use super::CheckpointStore;
use crate::config::Network;
use crate::error::{MigratorError, MigratorResult};

/// File name of the per-network checkpoint document
pub const CHECKPOINT_FILE_NAME: &str = "migration-checkpoint.json";

pub struct JsonFileCheckpointStore {
    path: PathBuf,
    document: Mutex<Value>,
}

impl JsonFileCheckpointStore {
    /// Open the checkpoint document for a network under `dir`
    pub async fn for_network(dir: impl AsRef<Path>, network: Network) -> MigratorResult<Self> {
        let path = dir.as_ref().join(network.as_str()).join(CHECKPOINT_FILE_NAME);
        Self::open(path).await
    }

    /// Open a checkpoint document, starting empty when the file does not exist
    pub async fn open(path: impl Into<PathBuf>) -> MigratorResult<Self> {
        let path = path.into();

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Value::Object(Map::new()),
            Ok(content) => {
                let value: Value = serde_json::from_str(&content).map_err(|e| {
                    MigratorError::Configuration(format!(
                        "Malformed checkpoint document {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                if !value.is_object() {
                    return Err(MigratorError::Configuration(format!(
                        "Checkpoint document {} must be a JSON object",
                        path.display()
                    )));
                }
                value
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No checkpoint at {}, starting fresh", path.display());
                Value::Object(Map::new())
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &Value) -> MigratorResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(document)?;

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    CheckpointKey::segments(key)
        .into_iter()
        .try_fold(document, |node, segment| node.as_object()?.get(segment))
}

fn insert(document: &mut Value, key: &str, value: Value) -> MigratorResult<()> {
    let segments = CheckpointKey::segments(key);
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(MigratorError::Checkpoint("empty checkpoint key".to_string()));
    };

    let mut node = document;
    for segment in parents {
        let object = node.as_object_mut().ok_or_else(|| {
            MigratorError::Checkpoint(format!("key {} crosses a non-object value", key))
        })?;
        node = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let object = node.as_object_mut().ok_or_else(|| {
        MigratorError::Checkpoint(format!("key {} crosses a non-object value", key))
    })?;
    object.insert(leaf.to_string(), value);
    Ok(())
}

#[async_trait]
impl CheckpointStore for JsonFileCheckpointStore {
    async fn get(&self, key: &str) -> MigratorResult<Option<Value>> {
        let document = self.document.lock().await;
        Ok(lookup(&document, key).cloned())
    }

    /// Every write re-serializes and fsyncs the whole document, so the cost
    /// of one `set` grows with the number of keys already stored. Migrating
    /// n scanners writes on the order of n² bytes in total.
    async fn set(&self, key: &str, value: Value) -> MigratorResult<()> {
        let mut document = self.document.lock().await;

        // Only publish the new document in memory once it is on disk
        let mut updated = document.clone();
        insert(&mut updated, key, value)?;
        self.persist(&updated).await?;
        *document = updated;

        debug!("Checkpoint {} written", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointStoreExt;
    use scanner_migration_types::{Address, GroupKey, PoolId};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let group = GroupKey::new("0xA", 137);
        let scanner = Address::new("0xS1");

        let store = JsonFileCheckpointStore::for_network(temp_dir.path(), Network::Polygon).await?;
        store.set_pool_id(&group, PoolId(7)).await?;
        store.mark_migrated(group.chain_id, &group.owner, &scanner).await?;
        let path = store.path().to_path_buf();
        drop(store);

        let reopened = JsonFileCheckpointStore::open(&path).await?;
        assert_eq!(reopened.pool_id(&group).await?, Some(PoolId(7)));
        assert!(reopened.is_migrated(group.chain_id, &group.owner, &scanner).await?);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(raw["137"]["0xa"]["poolId"], Value::from(7));
        assert_eq!(raw["137"]["0xa"]["records"]["0xs1"]["migrated"], Value::Bool(true));
        assert!(!path.with_extension("json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = JsonFileCheckpointStore::open(temp_dir.path().join("absent.json")).await?;
        assert_eq!(store.get("137.0xa.poolId").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_document_is_rejected() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json")?;

        let err = JsonFileCheckpointStore::open(&path).await.err().expect("malformed document");
        assert!(err.is_fatal());
        Ok(())
    }

    #[tokio::test]
    async fn test_key_crossing_a_leaf_fails_without_side_effects() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = JsonFileCheckpointStore::open(temp_dir.path().join("c.json")).await?;
        store.set("137.0xa.poolId", Value::from(7)).await?;

        assert!(store.set("137.0xa.poolId.nested", Value::Bool(true)).await.is_err());
        assert_eq!(store.get("137.0xa.poolId").await?, Some(Value::from(7)));
        Ok(())
    }
}
