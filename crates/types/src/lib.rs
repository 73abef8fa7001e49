/// Shared types for the scanner to scanner-pool migration
///
/// This crate provides the data model shared by the migrator core, its
/// ledger adapters and the relayer that signs on its behalf: scanner
/// records, group keys, pool ids, the checkpoint key scheme and the
/// operations and outcomes exchanged with the ledger.

pub mod checkpoint;
pub mod constants;
pub mod ledger;
pub mod scanner;

// Re-export all public types
pub use checkpoint::*;
pub use constants::*;
pub use ledger::*;
pub use scanner::*;
