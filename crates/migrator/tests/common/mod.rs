//! Shared fixtures for migrator integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use scanner_migration_types::{
    Address, ChainId, GroupKey, LedgerEvent, LedgerOperation, Outcome, PoolId, ScannerRecord,
};
use scanner_migrator::{
    CheckpointStore, DataSource, LedgerClient, MigrationOrchestrator, MigratorError, MigratorResult, Network,
    RunSettings, StatusSink, StatusSnapshot,
};

pub const OWNER_A: &str = "0xA000000000000000000000000000000000000001";
pub const OWNER_B: &str = "0xB000000000000000000000000000000000000002";
pub const POLYGON: u64 = 137;
pub const STRANGER: &str = "0xC000000000000000000000000000000000000003";

// ============================================================================
// Fake ledger
// ============================================================================

/// How a mint misreports the pool it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSignalFault {
    /// No `MigrationExecuted` event at all
    Missing,
    /// The event names `STRANGER` as owner
    WrongGroup,
    /// The event carries the sentinel pool id
    Sentinel,
}

#[derive(Default)]
struct LedgerState {
    next_pool: u64,
    pools: HashMap<GroupKey, PoolId>,
    migrated: HashSet<(ChainId, Address)>,
    operations: Vec<LedgerOperation>,
    failing_owners: HashSet<Address>,
    signal_faults: HashMap<Address, PoolSignalFault>,
    /// Owners whose submissions never get an answer; `true` spares the mint
    unreachable: HashMap<Address, bool>,
    dropped: HashSet<Address>,
    cancel_after: Option<(usize, CancellationToken)>,
    health_calls: usize,
}

/// In-memory pool registry standing in for the relayer.
///
/// Mints sequential pool ids and no-ops scanners it already migrated. It can
/// be scripted to revert, to time out, to misreport events or to trip a
/// cancellation token.
pub struct FakeLedger {
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    /// The first minted pool gets `first_pool_id`
    pub fn new(first_pool_id: u64) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                next_pool: first_pool_id,
                ..LedgerState::default()
            }),
        }
    }

    /// Every operation for this owner is reverted
    pub fn fail_owner(&self, owner: &str) {
        self.state.lock().unwrap().failing_owners.insert(Address::new(owner));
    }

    pub fn recover_owner(&self, owner: &str) {
        self.state.lock().unwrap().failing_owners.remove(&Address::new(owner));
    }

    /// Mints for this owner succeed but carry no `MigrationExecuted` event
    pub fn silence_pool_signal(&self, owner: &str) {
        self.fault_pool_signal(owner, PoolSignalFault::Missing);
    }

    /// Mints for this owner succeed but report the pool wrongly
    pub fn fault_pool_signal(&self, owner: &str, fault: PoolSignalFault) {
        self.state.lock().unwrap().signal_faults.insert(Address::new(owner), fault);
    }

    /// Every submission for this owner times out before reaching the registry
    pub fn cut_off_owner(&self, owner: &str) {
        self.state.lock().unwrap().unreachable.insert(Address::new(owner), false);
    }

    /// Mints for this owner go through, later submissions time out
    pub fn cut_off_owner_after_mint(&self, owner: &str) {
        self.state.lock().unwrap().unreachable.insert(Address::new(owner), true);
    }

    /// The next submission of this scanner silently does nothing
    pub fn drop_confirmation(&self, scanner: &str) {
        self.state.lock().unwrap().dropped.insert(Address::new(scanner));
    }

    /// Cancel `token` once `operations` submissions have been made
    pub fn cancel_after(&self, operations: usize, token: CancellationToken) {
        self.state.lock().unwrap().cancel_after = Some((operations, token));
    }

    /// Pretend a pool already exists on-chain for the group
    pub fn seed_pool(&self, group: &GroupKey, pool_id: u64) {
        self.state.lock().unwrap().pools.insert(group.clone(), PoolId(pool_id));
    }

    pub fn seed_migrated(&self, chain_id: u64, scanner: &str) {
        self.state
            .lock()
            .unwrap()
            .migrated
            .insert((ChainId(chain_id), Address::new(scanner)));
    }

    pub fn operations(&self) -> Vec<LedgerOperation> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn operation_sizes(&self) -> Vec<usize> {
        self.operations().iter().map(LedgerOperation::len).collect()
    }

    pub fn mint_count(&self) -> usize {
        self.operations().iter().filter(|op| op.is_mint()).count()
    }

    pub fn health_calls(&self) -> usize {
        self.state.lock().unwrap().health_calls
    }

    pub fn is_migrated(&self, chain_id: u64, scanner: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .migrated
            .contains(&(ChainId(chain_id), Address::new(scanner)))
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn submit(&self, operation: &LedgerOperation) -> MigratorResult<Outcome> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.operations.push(operation.clone());
        let sequence = state.operations.len();

        if let Some((after, token)) = &state.cancel_after {
            if sequence >= *after {
                token.cancel();
            }
        }

        let group = operation.group_key();
        if let Some(&spare_mint) = state.unreachable.get(&group.owner) {
            if !(spare_mint && operation.is_mint()) {
                return Err(MigratorError::TransientSubmission(format!(
                    "relayer did not answer within the timeout for {}",
                    group
                )));
            }
        }
        if state.failing_owners.contains(&group.owner) {
            return Ok(Outcome::failed("execution reverted"));
        }

        let (pool_id, minted) = match operation {
            LedgerOperation::MintPoolAndMigrate { .. } => match state.pools.get(&group).copied() {
                Some(existing) => (existing, false),
                None => {
                    let pool_id = PoolId(state.next_pool);
                    state.next_pool += 1;
                    state.pools.insert(group.clone(), pool_id);
                    (pool_id, true)
                }
            },
            LedgerOperation::MigrateIntoPool { pool_id, .. } => (*pool_id, false),
        };

        let mut events = Vec::new();
        let mut migrated = 0;
        let mut ignored = 0;
        for scanner in operation.scanners() {
            let key = (group.chain_id, scanner.clone());
            if state.migrated.contains(&key) || state.dropped.remove(scanner) {
                ignored += 1;
                continue;
            }
            state.migrated.insert(key);
            migrated += 1;
            events.push(LedgerEvent::ScannerUpdated {
                scanner_id: scanner.clone(),
                chain_id: group.chain_id,
                metadata: String::new(),
                pool_id,
            });
        }

        let fault = match operation.is_mint() {
            true => state.signal_faults.get(&group.owner).copied(),
            false => None,
        };
        let (reported_pool, reported_owner) = match fault {
            Some(PoolSignalFault::Sentinel) => (PoolId::NONE, group.owner.clone()),
            Some(PoolSignalFault::WrongGroup) => (pool_id, Address::new(STRANGER)),
            _ => (pool_id, group.owner.clone()),
        };
        if fault != Some(PoolSignalFault::Missing) {
            events.insert(
                0,
                LedgerEvent::MigrationExecuted {
                    scanners_migrated: migrated,
                    scanners_ignored: ignored,
                    pool_id: reported_pool,
                    owner: reported_owner,
                    chain_id: group.chain_id,
                    minted_pool: minted,
                },
            );
        }

        Ok(Outcome::confirmed(format!("0x{:064x}", sequence), events))
    }

    async fn health_check(&self) -> MigratorResult<()> {
        self.state.lock().unwrap().health_calls += 1;
        Ok(())
    }
}

// ============================================================================
// Source and sink
// ============================================================================

pub struct VecSource {
    records: Vec<ScannerRecord>,
}

impl VecSource {
    pub fn new(records: Vec<ScannerRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl DataSource for VecSource {
    async fn load(&self) -> MigratorResult<Vec<ScannerRecord>> {
        Ok(self.records.clone())
    }
}

/// Keeps every snapshot it is handed
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<StatusSnapshot>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn write_snapshot(&self, snapshot: &StatusSnapshot, _network: Network) -> MigratorResult<()> {
        if self.fail {
            return Err(MigratorError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "status directory is read-only",
            )));
        }
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn scanner_id(n: usize) -> String {
    format!("0x{:040x}", n)
}

/// `count` scanners numbered from `first`, all owned by `owner` on `chain`
pub fn scanners(owner: &str, chain: u64, first: usize, count: usize) -> Vec<ScannerRecord> {
    (first..first + count)
        .map(|n| ScannerRecord::new(scanner_id(n).as_str(), owner, chain))
        .collect()
}

pub fn settings(chunk_size: usize) -> RunSettings {
    RunSettings {
        network: Network::Local,
        chunk_size,
        dry_run: false,
    }
}

pub fn orchestrator(
    settings: RunSettings,
    store: Arc<dyn CheckpointStore>,
    ledger: Arc<FakeLedger>,
    records: Vec<ScannerRecord>,
    sink: Arc<RecordingSink>,
) -> MigrationOrchestrator {
    MigrationOrchestrator::new(settings, store, ledger, Arc::new(VecSource::new(records)), sink)
}
