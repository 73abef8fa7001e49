//! Status snapshots of migration progress
//!
//! Snapshots are observational output for operators; the migrator never
//! reads them back.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::info;

use scanner_migration_types::{GroupKey, PoolId, ScannerRecord};

use crate::config::Network;
use crate::error::MigratorResult;

/// File name of the per-network status snapshot
pub const STATUS_FILE_NAME: &str = "migration-scanners.json";

/// Records as they stand after a run, with the pool cached for each group
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub records: Vec<ScannerRecord>,
    pub pools: BTreeMap<GroupKey, PoolId>,
}

impl StatusSnapshot {
    /// Render as chain → owner → { poolId, scanners: id → record }
    pub fn to_document(&self, network: Network) -> Value {
        let mut chains: Map<String, Value> = Map::new();

        for record in &self.records {
            let owners = chains
                .entry(record.chain_id.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Some(owners) = owners.as_object_mut() else { continue };

            let owner_entry = owners.entry(record.owner.to_string()).or_insert_with(|| {
                let pool_id = self.pools.get(&record.group_key()).copied();
                json!({ "poolId": pool_id, "scanners": {} })
            });

            if let Some(scanners) = owner_entry.get_mut("scanners").and_then(Value::as_object_mut) {
                scanners.insert(record.id.to_string(), json!(record));
            }
        }

        json!({
            "network": network.as_str(),
            "generatedAt": Utc::now().to_rfc3339(),
            "chains": chains,
        })
    }
}

/// Status sink port
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn write_snapshot(&self, snapshot: &StatusSnapshot, network: Network) -> MigratorResult<()>;
}

/// Writes `{dir}/{network}/migration-scanners.json`
pub struct JsonFileStatusSink {
    dir: PathBuf,
}

impl JsonFileStatusSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, network: Network) -> PathBuf {
        self.dir.join(network.as_str()).join(STATUS_FILE_NAME)
    }
}

#[async_trait]
impl StatusSink for JsonFileStatusSink {
    async fn write_snapshot(&self, snapshot: &StatusSnapshot, network: Network) -> MigratorResult<()> {
        let path = self.path_for(network);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&snapshot.to_document(network))?;
        tokio::fs::write(&path, content).await?;

        info!("Status snapshot written to {}", path.display());
        Ok(())
    }
}
