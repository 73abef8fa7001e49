/// Operations submitted to the ledger and the outcomes it reports back

use serde::{Deserialize, Serialize};
use crate::scanner::{Address, ChainId, GroupKey, PoolId};

// ============================================================================
// Operations
// ============================================================================

/// A state-changing migration request, submitted as one ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerOperation {
    /// Mint a new pool for the owner and migrate the scanners into it
    MintPoolAndMigrate {
        owner: Address,
        chain_id: ChainId,
        scanners: Vec<Address>,
    },

    /// Multicall migrating every scanner into an existing pool
    MigrateIntoPool {
        pool_id: PoolId,
        owner: Address,
        chain_id: ChainId,
        scanners: Vec<Address>,
    },
}

impl LedgerOperation {
    pub fn mint(group: &GroupKey, scanners: Vec<Address>) -> Self {
        Self::MintPoolAndMigrate {
            owner: group.owner.clone(),
            chain_id: group.chain_id,
            scanners,
        }
    }

    pub fn migrate(group: &GroupKey, pool_id: PoolId, scanners: Vec<Address>) -> Self {
        Self::MigrateIntoPool {
            pool_id,
            owner: group.owner.clone(),
            chain_id: group.chain_id,
            scanners,
        }
    }

    /// Pool id argument passed to the registry (the sentinel when minting)
    pub fn target_pool(&self) -> PoolId {
        match self {
            Self::MintPoolAndMigrate { .. } => PoolId::NONE,
            Self::MigrateIntoPool { pool_id, .. } => *pool_id,
        }
    }

    pub fn scanners(&self) -> &[Address] {
        match self {
            Self::MintPoolAndMigrate { scanners, .. } | Self::MigrateIntoPool { scanners, .. } => scanners,
        }
    }

    pub fn group_key(&self) -> GroupKey {
        match self {
            Self::MintPoolAndMigrate { owner, chain_id, .. }
            | Self::MigrateIntoPool { owner, chain_id, .. } => GroupKey::new(owner.clone(), *chain_id),
        }
    }

    pub fn is_mint(&self) -> bool {
        matches!(self, Self::MintPoolAndMigrate { .. })
    }

    pub fn len(&self) -> usize {
        self.scanners().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners().is_empty()
    }
}

// ============================================================================
// Events
// ============================================================================

/// Structured signal emitted by the registries during an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    /// Emitted once per migrate call; carries the pool the scanners landed in
    MigrationExecuted {
        #[serde(default)]
        scanners_migrated: u64,
        #[serde(default)]
        scanners_ignored: u64,
        pool_id: PoolId,
        owner: Address,
        chain_id: ChainId,
        /// True when the pool was freshly minted, false when an existing pool was reused
        minted_pool: bool,
    },

    /// Emitted by the pool registry for every scanner it registered
    ScannerUpdated {
        scanner_id: Address,
        chain_id: ChainId,
        #[serde(default)]
        metadata: String,
        pool_id: PoolId,
    },

    /// Any event the migrator does not interpret
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Outcome
// ============================================================================

/// Terminal status of a submitted operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Transaction mined successfully
    Confirmed,

    /// Transaction rejected, reverted or dropped
    Failed { reason: String },
}

/// Result of submitting one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(flatten)]
    pub status: OutcomeStatus,

    /// Transaction hash, when the ledger assigned one
    #[serde(default)]
    pub tx_hash: Option<String>,

    /// Events emitted by the transaction, in log order
    #[serde(default)]
    pub events: Vec<LedgerEvent>,
}

impl Outcome {
    pub fn confirmed(tx_hash: impl Into<String>, events: Vec<LedgerEvent>) -> Self {
        Self {
            status: OutcomeStatus::Confirmed,
            tx_hash: Some(tx_hash.into()),
            events,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed { reason: reason.into() },
            tx_hash: None,
            events: Vec::new(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_targets_sentinel_pool() {
        let group = GroupKey::new("0xA", 137);
        let mint = LedgerOperation::mint(&group, vec![Address::new("0xS1")]);
        assert!(mint.is_mint());
        assert!(mint.target_pool().is_none());
        assert_eq!(mint.group_key(), group);

        let migrate = LedgerOperation::migrate(&group, PoolId(7), vec![]);
        assert_eq!(migrate.target_pool(), PoolId(7));
        assert!(migrate.is_empty());
    }

    #[test]
    fn test_outcome_wire_format() {
        let json = r#"{
            "status": "confirmed",
            "tx_hash": "0xabc",
            "events": [
                {"event": "MigrationExecuted", "pool_id": "7", "owner": "0xA", "chain_id": 137, "minted_pool": true},
                {"event": "ScannerUpdated", "scanner_id": "0xS1", "chain_id": 137, "pool_id": 7},
                {"event": "Transfer"}
            ]
        }"#;
        let outcome: Outcome = serde_json::from_str(json).unwrap();
        assert!(outcome.is_confirmed());
        assert_eq!(outcome.events.len(), 3);
        assert_eq!(outcome.events[2], LedgerEvent::Unknown);

        let failed: Outcome = serde_json::from_str(r#"{"status":"failed","reason":"reverted"}"#).unwrap();
        assert_eq!(failed.status, OutcomeStatus::Failed { reason: "reverted".to_string() });
    }
}
