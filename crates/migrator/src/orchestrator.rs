//! Drives a migration run across all groups
//!
//! Each group moves through `PendingPool -> PoolReady -> Chunking -> Done`.
//! Groups run one after another; a failure abandons only the group it
//! happened in. Progress lives exclusively in the checkpoint store, so each
//! run starts by re-deriving what is still pending.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use scanner_migration_types::{GroupKey, PoolId, ScannerGroup, ScannerRecord};

use crate::checkpoint::{CheckpointStore, CheckpointStoreExt};
use crate::chunker;
use crate::config::{MigratorConfig, Network};
use crate::error::MigratorResult;
use crate::grouper;
use crate::ledger::LedgerClient;
use crate::pool_resolver::PoolResolver;
use crate::report::{GroupReport, GroupStatus, MigrationReport};
use crate::sink::{StatusSink, StatusSnapshot};
use crate::source::DataSource;
use crate::submitter::BatchSubmitter;
use crate::verifier::OutcomeVerifier;

/// The part of the configuration the orchestrator acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub network: Network,
    pub chunk_size: usize,
    pub dry_run: bool,
}

impl From<&MigratorConfig> for RunSettings {
    fn from(config: &MigratorConfig) -> Self {
        Self {
            network: config.network,
            chunk_size: config.chunk_size,
            dry_run: config.dry_run,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupState {
    PendingPool,
    PoolReady(PoolId),
    Chunking { pool_id: PoolId, next: usize },
    Done,
}

/// What happened to a group during this run
#[derive(Debug, Default)]
struct GroupProgress {
    operations: usize,
    confirmed: usize,
    unconfirmed: usize,
    cancelled: bool,
}

pub struct MigrationOrchestrator {
    settings: RunSettings,
    store: Arc<dyn CheckpointStore>,
    ledger: Arc<dyn LedgerClient>,
    source: Arc<dyn DataSource>,
    sink: Arc<dyn StatusSink>,
    submitter: BatchSubmitter,
    resolver: PoolResolver,
}

impl MigrationOrchestrator {
    pub fn new(
        settings: RunSettings,
        store: Arc<dyn CheckpointStore>,
        ledger: Arc<dyn LedgerClient>,
        source: Arc<dyn DataSource>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        let submitter = BatchSubmitter::new(ledger.clone(), store.clone(), settings.chunk_size);
        let resolver = PoolResolver::new(store.clone());

        Self {
            settings,
            store,
            ledger,
            source,
            sink,
            submitter,
            resolver,
        }
    }

    /// Run one migration pass.
    ///
    /// Returns an error only for failures before any mutation (unreadable
    /// data source or checkpoint). Group failures end up in the report.
    pub async fn run(&self, cancel: &CancellationToken) -> MigratorResult<MigrationReport> {
        info!(
            "Starting scanner migration on {} (chunk size {}{})",
            self.settings.network,
            self.settings.chunk_size,
            if self.settings.dry_run { ", dry run" } else { "" }
        );

        if !self.settings.dry_run {
            if let Err(e) = self.ledger.health_check().await {
                warn!("Ledger health check failed: {}", e);
            }
        }

        let mut records = grouper::distinct(self.source.load().await?);
        self.overlay_checkpoint(&mut records).await?;

        let groups = grouper::group_pending(&records);
        info!(
            "{} of {} scanners pending across {} groups",
            groups.iter().map(ScannerGroup::len).sum::<usize>(),
            records.len(),
            groups.len()
        );

        let mut statuses: HashMap<GroupKey, (GroupStatus, GroupProgress)> = HashMap::new();

        for group in &groups {
            if cancel.is_cancelled() {
                statuses.insert(group.key.clone(), (GroupStatus::Cancelled, GroupProgress::default()));
                continue;
            }

            let result = if self.settings.dry_run {
                self.plan_group(group).await
            } else {
                self.migrate_group(group, cancel).await
            };

            let entry = match result {
                Ok(progress) if progress.cancelled => (GroupStatus::Cancelled, progress),
                Ok(progress) if self.settings.dry_run => (GroupStatus::Planned, progress),
                Ok(progress) => (GroupStatus::Completed, progress),
                Err(e) => {
                    error!("Abandoning group {} for this run: {}", group.key, e);
                    (GroupStatus::Failed { reason: e.to_string() }, GroupProgress::default())
                }
            };
            statuses.insert(group.key.clone(), entry);
        }

        self.overlay_checkpoint(&mut records).await?;
        let pools = self.cached_pools(&records).await?;

        let snapshot = StatusSnapshot { records, pools };
        if let Err(e) = self.sink.write_snapshot(&snapshot, self.settings.network).await {
            warn!("Failed to write status snapshot: {}", e);
        }

        let report = self.build_report(&snapshot, statuses, cancel.is_cancelled());
        report.log_summary();
        Ok(report)
    }

    async fn migrate_group(&self, group: &ScannerGroup, cancel: &CancellationToken) -> MigratorResult<GroupProgress> {
        let mut progress = GroupProgress::default();
        let mut remaining: &[ScannerRecord] = &group.records;
        let mut chunks: Vec<&[ScannerRecord]> = Vec::new();
        let mut state = GroupState::PendingPool;

        info!("Migrating group {} ({} pending scanners)", group.key, group.len());

        loop {
            debug!("Group {} in state {:?}", group.key, state);

            state = match state {
                GroupState::PendingPool => {
                    let resolution = self.resolver.resolve(&self.submitter, group).await?;
                    if let Some(consumed) = &resolution.consumed {
                        progress.operations += 1;
                        if resolution.consumed_confirmed {
                            progress.confirmed += 1;
                        } else {
                            progress.unconfirmed += 1;
                            warn!(
                                "Mint for group {} did not confirm scanner {}; it stays pending",
                                group.key, consumed
                            );
                        }
                        remaining = group.records.split_first().map(|(_, rest)| rest).unwrap_or(&[]);
                    }
                    GroupState::PoolReady(resolution.pool_id)
                }
                GroupState::PoolReady(pool_id) => {
                    chunks = chunker::chunk(remaining, self.settings.chunk_size);
                    debug!("Group {} split into {} chunks", group.key, chunks.len());
                    GroupState::Chunking { pool_id, next: 0 }
                }
                GroupState::Chunking { next, .. } if next >= chunks.len() => GroupState::Done,
                GroupState::Chunking { pool_id, next } => {
                    if cancel.is_cancelled() {
                        info!("Stop requested, leaving group {} after {} chunks", group.key, next);
                        progress.cancelled = true;
                        return Ok(progress);
                    }
                    self.migrate_chunk(&group.key, pool_id, chunks[next], &mut progress).await?;
                    GroupState::Chunking { pool_id, next: next + 1 }
                }
                GroupState::Done => {
                    info!(
                        "Group {} done: {} confirmed, {} unconfirmed in {} operations",
                        group.key, progress.confirmed, progress.unconfirmed, progress.operations
                    );
                    return Ok(progress);
                }
            };
        }
    }

    async fn migrate_chunk(
        &self,
        key: &GroupKey,
        pool_id: PoolId,
        chunk: &[ScannerRecord],
        progress: &mut GroupProgress,
    ) -> MigratorResult<()> {
        let Some(submission) = self.submitter.submit_chunk(key, pool_id, chunk).await? else {
            debug!("Chunk of group {} already confirmed, skipping", key);
            return Ok(());
        };
        progress.operations += 1;

        let verification = OutcomeVerifier::inspect(key, submission.operation.scanners(), &submission.outcome);
        if let Some(signal) = &verification.pool {
            if signal.pool_id != pool_id {
                warn!(
                    "Group {} targeted pool {} but the registry reported pool {}",
                    key, pool_id, signal.pool_id
                );
            }
        }

        let confirmed = OutcomeVerifier::commit(self.store.as_ref(), key, &verification).await?;
        progress.confirmed += confirmed;
        progress.unconfirmed += verification.unconfirmed.len();

        if verification.is_partial() {
            warn!(
                "Only {} of {} scanners confirmed for group {} in {}; the rest stay pending",
                confirmed,
                submission.operation.len(),
                key,
                verification.tx_hash.as_deref().unwrap_or("<unknown tx>")
            );
        }

        Ok(())
    }

    /// Log what a real run would submit for the group
    async fn plan_group(&self, group: &ScannerGroup) -> MigratorResult<GroupProgress> {
        let mut progress = GroupProgress::default();
        let mut remaining: &[ScannerRecord] = &group.records;

        match self.store.pool_id(&group.key).await? {
            Some(pool_id) => info!("DRY RUN: group {} would reuse pool {}", group.key, pool_id),
            None => {
                if let Some((first, rest)) = group.records.split_first() {
                    info!("DRY RUN: group {} would mint a pool with scanner {}", group.key, first.id);
                    progress.operations += 1;
                    remaining = rest;
                }
            }
        }

        for chunk in chunker::chunk(remaining, self.settings.chunk_size) {
            info!("DRY RUN: group {} would migrate {} scanners in one operation", group.key, chunk.len());
            progress.operations += 1;
        }

        Ok(progress)
    }

    /// A record counts as migrated if the source or the checkpoint says so
    async fn overlay_checkpoint(&self, records: &mut [ScannerRecord]) -> MigratorResult<()> {
        for record in records.iter_mut() {
            if !record.migrated {
                record.migrated = self.store.is_migrated(record.chain_id, &record.owner, &record.id).await?;
            }
        }
        Ok(())
    }

    async fn cached_pools(&self, records: &[ScannerRecord]) -> MigratorResult<BTreeMap<GroupKey, PoolId>> {
        let mut pools = BTreeMap::new();
        for record in records {
            let key = record.group_key();
            if pools.contains_key(&key) {
                continue;
            }
            if let Some(pool_id) = self.store.pool_id(&key).await? {
                pools.insert(key, pool_id);
            }
        }
        Ok(pools)
    }

    fn build_report(
        &self,
        snapshot: &StatusSnapshot,
        mut statuses: HashMap<GroupKey, (GroupStatus, GroupProgress)>,
        cancelled: bool,
    ) -> MigrationReport {
        let mut order: Vec<GroupKey> = Vec::new();
        let mut counts: HashMap<GroupKey, (usize, usize)> = HashMap::new();

        for record in &snapshot.records {
            let key = record.group_key();
            let entry = counts.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (0, 0)
            });
            entry.0 += 1;
            if record.migrated {
                entry.1 += 1;
            }
        }

        let groups = order
            .into_iter()
            .map(|key| {
                let (total, migrated) = counts.get(&key).copied().unwrap_or_default();
                let pending = total - migrated;
                let (status, progress) = statuses
                    .remove(&key)
                    .unwrap_or((GroupStatus::AlreadyComplete, GroupProgress::default()));
                let status = match status {
                    GroupStatus::Completed if pending > 0 => GroupStatus::Partial,
                    other => other,
                };

                GroupReport {
                    pool_id: snapshot.pools.get(&key).copied(),
                    key,
                    total,
                    migrated,
                    pending,
                    operations: progress.operations,
                    unconfirmed: progress.unconfirmed,
                    status,
                }
            })
            .collect();

        MigrationReport {
            network: self.settings.network,
            dry_run: self.settings.dry_run,
            cancelled,
            groups,
        }
    }
}
