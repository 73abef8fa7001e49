/// Hierarchical key scheme for persisted migration progress
///
/// Keys are namespaced by chain and owner:
///
/// ```text
/// {chain}.{owner}.poolId                  -> pool id
/// {chain}.{owner}.records.{id}.migrated   -> bool
/// ```

use crate::constants::*;
use crate::scanner::{Address, ChainId, GroupKey};

/// Builders for checkpoint keys
pub struct CheckpointKey;

impl CheckpointKey {
    /// Key holding the pool id cached for a group
    pub fn pool_id(group: &GroupKey) -> String {
        format!("{}{}{}", group, KEY_SEPARATOR, POOL_ID_SEGMENT)
    }

    /// Key holding a single record's migrated flag
    pub fn record_migrated(chain_id: ChainId, owner: &Address, id: &Address) -> String {
        format!(
            "{chain}{sep}{owner}{sep}{records}{sep}{id}{sep}{migrated}",
            chain = chain_id,
            owner = owner,
            id = id,
            sep = KEY_SEPARATOR,
            records = RECORDS_SEGMENT,
            migrated = MIGRATED_SEGMENT,
        )
    }

    /// Split a key into its path segments
    pub fn segments(key: &str) -> Vec<&str> {
        key.split(KEY_SEPARATOR).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let group = GroupKey::new("0xA", 137);
        assert_eq!(CheckpointKey::pool_id(&group), "137.0xa.poolId");

        let key = CheckpointKey::record_migrated(ChainId(137), &group.owner, &Address::new("0xS1"));
        assert_eq!(key, "137.0xa.records.0xs1.migrated");
        assert_eq!(
            CheckpointKey::segments(&key),
            vec!["137", "0xa", "records", "0xs1", "migrated"]
        );
    }
}
