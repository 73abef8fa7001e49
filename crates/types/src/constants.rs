/// Constants shared across the migration components

// ============================================================================
// Batching
// ============================================================================

/// Default number of scanners submitted in a single multicall
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Upper bound accepted for a configured chunk size
pub const MAX_CHUNK_SIZE: usize = 1_000;

// ============================================================================
// Pool Registry
// ============================================================================

/// Pool id passed to the registry to request minting a new pool
pub const NO_EXISTING_POOL: u64 = 0;

// ============================================================================
// Checkpoint Key Segments
// ============================================================================

/// Separator between hierarchical checkpoint key segments
pub const KEY_SEPARATOR: char = '.';

/// Leaf segment holding a group's cached pool id
pub const POOL_ID_SEGMENT: &str = "poolId";

/// Segment under which per-record entries live
pub const RECORDS_SEGMENT: &str = "records";

/// Leaf segment holding a record's migrated flag
pub const MIGRATED_SEGMENT: &str = "migrated";
