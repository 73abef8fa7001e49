//! Confirmation-gated interpretation of ledger outcomes
//!
//! A mined transaction is not proof that every scanner in it moved. Only
//! scanners with a matching `ScannerUpdated` event are marked migrated;
//! the rest stay pending and are picked up again on the next run.

use std::collections::HashSet;

use tracing::debug;

use scanner_migration_types::{Address, ChainId, GroupKey, LedgerEvent, Outcome, PoolId};

use crate::checkpoint::{CheckpointStore, CheckpointStoreExt};
use crate::error::MigratorResult;

/// Pool the registry reported for a migrate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSignal {
    pub pool_id: PoolId,
    pub owner: Address,
    pub chain_id: ChainId,
    /// Freshly minted rather than reused
    pub minted: bool,
}

impl PoolSignal {
    pub fn belongs_to(&self, group: &GroupKey) -> bool {
        self.owner == group.owner && self.chain_id == group.chain_id
    }
}

/// What an outcome proves about a submitted chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub tx_hash: Option<String>,
    pub pool: Option<PoolSignal>,
    /// Submitted scanners with a confirmation event, in submission order
    pub confirmed: Vec<Address>,
    /// Submitted scanners without one
    pub unconfirmed: Vec<Address>,
}

impl Verification {
    pub fn is_partial(&self) -> bool {
        !self.unconfirmed.is_empty()
    }
}

pub struct OutcomeVerifier;

impl OutcomeVerifier {
    /// Match an outcome's events against the scanners that were submitted
    pub fn inspect(group: &GroupKey, submitted: &[Address], outcome: &Outcome) -> Verification {
        if !outcome.is_confirmed() {
            return Verification {
                tx_hash: outcome.tx_hash.clone(),
                pool: None,
                confirmed: Vec::new(),
                unconfirmed: submitted.to_vec(),
            };
        }

        let mut pool: Option<PoolSignal> = None;
        let mut updated: HashSet<&Address> = HashSet::new();

        for event in &outcome.events {
            match event {
                LedgerEvent::MigrationExecuted { pool_id, owner, chain_id, minted_pool, .. } => {
                    let signal = PoolSignal {
                        pool_id: *pool_id,
                        owner: owner.clone(),
                        chain_id: *chain_id,
                        minted: *minted_pool,
                    };
                    // A minting signal outranks reuse signals from other calls in the batch
                    let replace = match &pool {
                        None => true,
                        Some(current) => !current.minted && signal.minted,
                    };
                    if replace {
                        pool = Some(signal);
                    }
                }
                LedgerEvent::ScannerUpdated { scanner_id, chain_id, .. } => {
                    if *chain_id == group.chain_id {
                        updated.insert(scanner_id);
                    } else {
                        debug!("Ignoring ScannerUpdated for {} on chain {}", scanner_id, chain_id);
                    }
                }
                LedgerEvent::Unknown => {}
            }
        }

        let (confirmed, unconfirmed): (Vec<Address>, Vec<Address>) = submitted
            .iter()
            .cloned()
            .partition(|id| updated.contains(id));

        Verification {
            tx_hash: outcome.tx_hash.clone(),
            pool,
            confirmed,
            unconfirmed,
        }
    }

    /// Persist the confirmed scanners, one durable write each
    pub async fn commit<S>(store: &S, group: &GroupKey, verification: &Verification) -> MigratorResult<usize>
    where
        S: CheckpointStore + ?Sized,
    {
        for id in &verification.confirmed {
            store.mark_migrated(group.chain_id, &group.owner, id).await?;
            debug!("Scanner {} confirmed migrated", id);
        }
        Ok(verification.confirmed.len())
    }
}
