/// Scanner records and the identifiers used to group them

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::constants::*;

// ============================================================================
// Identifiers
// ============================================================================

/// Account or scanner address
///
/// Ledgers report addresses in mixed case (checksummed or lowercased), so the
/// address is normalized to trimmed lowercase on construction and every
/// comparison, hash and checkpoint key uses that form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the address can be used as a single checkpoint key segment
    pub fn is_key_safe(&self) -> bool {
        !self.0.is_empty() && !self.0.contains(KEY_SEPARATOR)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chain a scanner is registered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_u64_lenient(deserializer).map(ChainId)
    }
}

impl FromStr for ChainId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ChainId)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned by the pool registry when a pool is minted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PoolId(pub u64);

impl PoolId {
    /// Sentinel asking the registry to mint a new pool
    pub const NONE: PoolId = PoolId(NO_EXISTING_POOL);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl<'de> Deserialize<'de> for PoolId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_u64_lenient(deserializer).map(PoolId)
    }
}

impl From<u64> for PoolId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accept either a JSON number or a decimal string.
///
/// uint256 values are commonly rendered as strings by ledger tooling.
fn deserialize_u64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Records and Groups
// ============================================================================

/// A scanner registered in the legacy registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerRecord {
    /// Scanner address, unique per chain
    pub id: Address,

    /// Account owning the scanner
    pub owner: Address,

    /// Chain the scanner monitors
    pub chain_id: ChainId,

    /// Opaque registration metadata
    #[serde(default)]
    pub metadata: String,

    /// Set once a ledger operation confirmed the migration
    #[serde(default)]
    pub migrated: bool,
}

impl ScannerRecord {
    pub fn new(id: impl Into<Address>, owner: impl Into<Address>, chain_id: impl Into<ChainId>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            chain_id: chain_id.into(),
            metadata: String::new(),
            migrated: false,
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.owner.clone(), self.chain_id)
    }
}

/// Records sharing an owner and a chain end up in the same pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub owner: Address,
    pub chain_id: ChainId,
}

impl GroupKey {
    pub fn new(owner: impl Into<Address>, chain_id: impl Into<ChainId>) -> Self {
        Self {
            owner: owner.into(),
            chain_id: chain_id.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.chain_id, KEY_SEPARATOR, self.owner)
    }
}

/// An (owner, chain) group of records awaiting migration, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerGroup {
    pub key: GroupKey,
    pub records: Vec<ScannerRecord>,
}

impl ScannerGroup {
    pub fn new(key: GroupKey) -> Self {
        Self { key, records: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
