//! Per-group summary of a migration run

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use scanner_migration_types::{GroupKey, PoolId};

use crate::config::Network;

/// How a group fared in this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupStatus {
    /// Nothing was pending at the start of the run
    AlreadyComplete,
    /// Every scanner of the group is now confirmed
    Completed,
    /// Operations went through but some scanners are still unconfirmed
    Partial,
    /// The group was abandoned for this run
    Failed { reason: String },
    /// A stop signal arrived before the group finished
    Cancelled,
    /// Dry run, nothing submitted
    Planned,
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupStatus::AlreadyComplete => f.write_str("already complete"),
            GroupStatus::Completed => f.write_str("completed"),
            GroupStatus::Partial => f.write_str("partial"),
            GroupStatus::Failed { reason } => write!(f, "failed ({})", reason),
            GroupStatus::Cancelled => f.write_str("cancelled"),
            GroupStatus::Planned => f.write_str("planned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub key: GroupKey,
    pub pool_id: Option<PoolId>,
    pub total: usize,
    pub migrated: usize,
    pub pending: usize,
    /// Ledger operations submitted (or planned, in a dry run)
    pub operations: usize,
    /// Submitted scanners the ledger did not confirm
    pub unconfirmed: usize,
    #[serde(flatten)]
    pub status: GroupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub network: Network,
    pub dry_run: bool,
    pub cancelled: bool,
    pub groups: Vec<GroupReport>,
}

impl MigrationReport {
    pub fn total_records(&self) -> usize {
        self.groups.iter().map(|g| g.total).sum()
    }

    pub fn migrated_records(&self) -> usize {
        self.groups.iter().map(|g| g.migrated).sum()
    }

    pub fn pending_records(&self) -> usize {
        self.groups.iter().map(|g| g.pending).sum()
    }

    pub fn failed_groups(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.status, GroupStatus::Failed { .. }))
            .count()
    }

    pub fn group(&self, key: &GroupKey) -> Option<&GroupReport> {
        self.groups.iter().find(|g| &g.key == key)
    }

    /// Nothing failed and nothing is left pending
    pub fn is_converged(&self) -> bool {
        self.failed_groups() == 0 && self.pending_records() == 0
    }

    pub fn log_summary(&self) {
        for group in &self.groups {
            let pool = group.pool_id.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
            if matches!(group.status, GroupStatus::Failed { .. }) {
                warn!(
                    "Group {} pool {}: {}/{} migrated, {} pending, {}",
                    group.key, pool, group.migrated, group.total, group.pending, group.status
                );
            } else {
                info!(
                    "Group {} pool {}: {}/{} migrated, {} pending, {}",
                    group.key, pool, group.migrated, group.total, group.pending, group.status
                );
            }
        }

        info!(
            "{}: {} groups, {} scanners, {} migrated, {} pending, {} failed groups{}",
            self.network,
            self.groups.len(),
            self.total_records(),
            self.migrated_records(),
            self.pending_records(),
            self.failed_groups(),
            if self.cancelled { " (stopped early)" } else { "" }
        );
    }
}
