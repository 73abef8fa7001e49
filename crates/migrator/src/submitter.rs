//! Turns chunks into ledger operations and submits them

use std::sync::Arc;

use tracing::{debug, info};

use scanner_migration_types::{
    Address, GroupKey, LedgerOperation, Outcome, OutcomeStatus, PoolId, ScannerRecord,
};

use crate::checkpoint::{CheckpointStore, CheckpointStoreExt};
use crate::error::{MigratorError, MigratorResult};
use crate::ledger::LedgerClient;

/// An operation together with its terminal, successful outcome
#[derive(Debug, Clone)]
pub struct Submission {
    pub operation: LedgerOperation,
    pub outcome: Outcome,
}

pub struct BatchSubmitter {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn CheckpointStore>,
    chunk_size: usize,
}

impl BatchSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, store: Arc<dyn CheckpointStore>, chunk_size: usize) -> Self {
        Self {
            ledger,
            store,
            chunk_size,
        }
    }

    /// Mint a pool for the group by migrating its first scanner with the sentinel pool id
    pub async fn submit_mint(&self, group: &GroupKey, first: &ScannerRecord) -> MigratorResult<Submission> {
        let operation = LedgerOperation::mint(group, vec![first.id.clone()]);
        self.submit(operation).await
    }

    /// Migrate a chunk into an existing pool.
    ///
    /// Scanners the checkpoint already confirms are dropped first; `None`
    /// means nothing was left to submit.
    pub async fn submit_chunk(
        &self,
        group: &GroupKey,
        pool_id: PoolId,
        chunk: &[ScannerRecord],
    ) -> MigratorResult<Option<Submission>> {
        if pool_id.is_none() {
            return Err(MigratorError::group_resolution(group, "chunk submitted without a pool"));
        }

        let mut scanners: Vec<Address> = Vec::with_capacity(chunk.len());
        for record in chunk {
            if self.store.is_migrated(group.chain_id, &group.owner, &record.id).await? {
                debug!("Scanner {} already confirmed, not resubmitting", record.id);
                continue;
            }
            scanners.push(record.id.clone());
        }

        if scanners.is_empty() {
            return Ok(None);
        }

        let operation = LedgerOperation::migrate(group, pool_id, scanners);
        self.submit(operation).await.map(Some)
    }

    async fn submit(&self, operation: LedgerOperation) -> MigratorResult<Submission> {
        if operation.len() > self.chunk_size {
            return Err(MigratorError::TransientSubmission(format!(
                "operation carries {} scanners, chunk size is {}",
                operation.len(),
                self.chunk_size
            )));
        }

        info!(
            "Submitting {} for {} scanners of {} (pool {})",
            if operation.is_mint() { "mint" } else { "migration" },
            operation.len(),
            operation.group_key(),
            operation.target_pool()
        );

        let outcome = self.ledger.submit(&operation).await?;

        match &outcome.status {
            OutcomeStatus::Confirmed => {
                debug!(
                    "Operation confirmed in {} with {} events",
                    outcome.tx_hash.as_deref().unwrap_or("<unknown tx>"),
                    outcome.events.len()
                );
                Ok(Submission { operation, outcome })
            }
            OutcomeStatus::Failed { reason } => Err(MigratorError::TransientSubmission(format!(
                "{} rejected: {}",
                outcome.tx_hash.as_deref().unwrap_or("operation"),
                reason
            ))),
        }
    }
}
