//! Scanner data source
//!
//! The JSON document is keyed by chain, then owner, then scanner id:
//!
//! ```json
//! { "137": { "0xOwner": { "0xScanner": {
//!     "id": "0xScanner", "owner": "0xOwner", "chainId": 137,
//!     "metadata": "", "migrated": false } } } }
//! ```
//!
//! Document order is preserved; it decides which scanner mints each pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use scanner_migration_types::{Address, ChainId, ScannerRecord};

use crate::error::{MigratorError, MigratorResult};

/// Data source port
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Load the full record set for this run
    async fn load(&self) -> MigratorResult<Vec<ScannerRecord>>;
}

pub struct JsonFileDataSource {
    path: PathBuf,
}

impl JsonFileDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataSource for JsonFileDataSource {
    async fn load(&self) -> MigratorResult<Vec<ScannerRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            MigratorError::DataSource(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|e| {
            MigratorError::DataSource(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        let records = parse_document(&document)?;
        info!("Loaded {} scanners from {}", records.len(), self.path.display());
        Ok(records)
    }
}

fn as_object<'a>(value: &'a Value, context: &str) -> MigratorResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| MigratorError::DataSource(format!("{} must be a JSON object", context)))
}

/// Flatten a chain → owner → id document into records, validating that
/// every record agrees with the keys it is filed under and that no scanner
/// id is filed under two owners of the same chain.
pub fn parse_document(document: &Value) -> MigratorResult<Vec<ScannerRecord>> {
    let mut records = Vec::new();

    for (chain_key, owners) in as_object(document, "document root")? {
        let chain_id: ChainId = chain_key.parse().map_err(|_| {
            MigratorError::DataSource(format!("chain key '{}' is not a chain id", chain_key))
        })?;
        let mut ids: HashSet<Address> = HashSet::new();

        for (owner_key, scanners) in as_object(owners, &format!("chain {}", chain_key))? {
            let owner = Address::new(owner_key);
            if !owner.is_key_safe() {
                return Err(MigratorError::DataSource(format!("invalid owner key '{}'", owner_key)));
            }

            for (id_key, raw) in as_object(scanners, &format!("owner {} on chain {}", owner_key, chain_key))? {
                let record: ScannerRecord = serde_json::from_value(raw.clone()).map_err(|e| {
                    MigratorError::DataSource(format!("scanner {} on chain {}: {}", id_key, chain_key, e))
                })?;

                if !record.id.is_key_safe() || record.id != Address::new(id_key) {
                    return Err(MigratorError::DataSource(format!(
                        "scanner filed under '{}' has id '{}'",
                        id_key, record.id
                    )));
                }
                if record.owner != owner {
                    return Err(MigratorError::DataSource(format!(
                        "scanner {} filed under owner {} claims owner {}",
                        record.id, owner, record.owner
                    )));
                }
                if record.chain_id != chain_id {
                    return Err(MigratorError::DataSource(format!(
                        "scanner {} filed under chain {} claims chain {}",
                        record.id, chain_id, record.chain_id
                    )));
                }
                if !ids.insert(record.id.clone()) {
                    return Err(MigratorError::DataSource(format!(
                        "scanner {} is filed more than once on chain {}",
                        record.id, chain_id
                    )));
                }

                records.push(record);
            }
        }
    }

    Ok(records)
}
