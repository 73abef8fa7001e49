//! Resolve the destination pool for a group
//!
//! A cached pool id is always reused. Without one, the group's first
//! scanner is migrated with the sentinel pool id, which makes the registry
//! mint a pool and move the scanner into it in the same transaction. The
//! pool id is persisted before anything else about the group, so a later
//! run can never mint a second pool for it.

use std::sync::Arc;

use tracing::info;

use scanner_migration_types::{Address, PoolId, ScannerGroup};

use crate::checkpoint::{CheckpointStore, CheckpointStoreExt};
use crate::error::{MigratorError, MigratorResult};
use crate::submitter::BatchSubmitter;
use crate::verifier::OutcomeVerifier;

/// Pool a group migrates into, and what minting it consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolResolution {
    pub pool_id: PoolId,
    /// Scanner carried by the mint operation, if one was submitted
    pub consumed: Option<Address>,
    /// Whether the mint operation confirmed the consumed scanner
    pub consumed_confirmed: bool,
    /// Freshly minted rather than cached or reused
    pub minted: bool,
}

impl PoolResolution {
    fn cached(pool_id: PoolId) -> Self {
        Self {
            pool_id,
            consumed: None,
            consumed_confirmed: false,
            minted: false,
        }
    }
}

pub struct PoolResolver {
    store: Arc<dyn CheckpointStore>,
}

impl PoolResolver {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, submitter: &BatchSubmitter, group: &ScannerGroup) -> MigratorResult<PoolResolution> {
        let key = &group.key;

        if let Some(pool_id) = self.store.pool_id(key).await? {
            info!("Group {} reuses cached pool {}", key, pool_id);
            return Ok(PoolResolution::cached(pool_id));
        }

        let Some(first) = group.records.first() else {
            return Err(MigratorError::group_resolution(key, "no pending scanner to mint with"));
        };

        let submission = submitter
            .submit_mint(key, first)
            .await
            .map_err(|e| MigratorError::group_resolution(key, format!("mint failed: {}", e)))?;

        let verification = OutcomeVerifier::inspect(key, submission.operation.scanners(), &submission.outcome);

        let signal = verification
            .pool
            .as_ref()
            .ok_or_else(|| MigratorError::group_resolution(key, "mint outcome carried no pool signal"))?;

        if !signal.belongs_to(key) {
            return Err(MigratorError::group_resolution(
                key,
                format!("pool signal names {}.{}", signal.chain_id, signal.owner),
            ));
        }
        if signal.pool_id.is_none() {
            return Err(MigratorError::group_resolution(key, "pool signal carried the sentinel pool id"));
        }

        // Pool first: a crash after this write resumes without minting again
        self.store.set_pool_id(key, signal.pool_id).await?;
        let confirmed = OutcomeVerifier::commit(self.store.as_ref(), key, &verification).await?;

        if signal.minted {
            info!("Minted pool {} for group {}", signal.pool_id, key);
        } else {
            info!("Registry reused pool {} for group {}", signal.pool_id, key);
        }

        Ok(PoolResolution {
            pool_id: signal.pool_id,
            consumed: Some(first.id.clone()),
            consumed_confirmed: confirmed > 0,
            minted: signal.minted,
        })
    }
}
