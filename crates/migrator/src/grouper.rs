//! Partition pending scanners into (owner, chain) groups

use std::collections::{HashMap, HashSet};

use tracing::warn;

use scanner_migration_types::{Address, ChainId, GroupKey, ScannerGroup, ScannerRecord};

/// Drop every record whose (chain, id) already appeared earlier.
///
/// The first occurrence wins. The rest never reach grouping, the status
/// snapshot or the report, so they cannot stay pending forever under an
/// owner whose checkpoint never covers them.
pub fn distinct(records: Vec<ScannerRecord>) -> Vec<ScannerRecord> {
    let mut seen: HashSet<(ChainId, Address)> = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let first = seen.insert((record.chain_id, record.id.clone()));
            if !first {
                warn!(
                    "Scanner {} appears more than once on chain {}, keeping first occurrence (owner {} dropped)",
                    record.id, record.chain_id, record.owner
                );
            }
            first
        })
        .collect()
}

/// Group every record that is not yet migrated by (owner, chain).
///
/// Groups come out in order of first appearance and keep source order
/// internally; the first record of a group is the one that mints its pool.
/// A scanner id that shows up twice on the same chain only counts once.
pub fn group_pending(records: &[ScannerRecord]) -> Vec<ScannerGroup> {
    let mut groups: Vec<ScannerGroup> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut seen: HashSet<(ChainId, Address)> = HashSet::new();

    for record in records {
        if !seen.insert((record.chain_id, record.id.clone())) {
            warn!(
                "Scanner {} appears more than once on chain {}, keeping first occurrence",
                record.id, record.chain_id
            );
            continue;
        }

        if record.migrated {
            continue;
        }

        let key = record.group_key();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(ScannerGroup::new(key));
            groups.len() - 1
        });
        groups[slot].records.push(record.clone());
    }

    groups
}
