//! Bounded batches of records for submission

use scanner_migration_types::ScannerRecord;

/// Split records into consecutive chunks of at most `chunk_size`, preserving order.
///
/// A zero chunk size is rejected by configuration validation and treated as 1 here.
pub fn chunk(records: &[ScannerRecord], chunk_size: usize) -> Vec<&[ScannerRecord]> {
    records.chunks(chunk_size.max(1)).collect()
}
