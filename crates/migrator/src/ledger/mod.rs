//! Ledger port
//!
//! The migrator never signs anything itself; a ledger client takes a
//! [`LedgerOperation`] to a terminal [`Outcome`] (mined, reverted or
//! rejected) and hands back the events the registries emitted.

pub mod relayer;

use async_trait::async_trait;

use scanner_migration_types::{LedgerOperation, Outcome};

use crate::error::MigratorResult;

pub use relayer::RelayerClient;

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit one operation and wait for its terminal result.
    ///
    /// Transport failures and timeouts are returned as errors; a transaction
    /// that was mined but reverted comes back as a failed [`Outcome`].
    async fn submit(&self, operation: &LedgerOperation) -> MigratorResult<Outcome>;

    /// Check that the ledger endpoint is reachable and ready to sign
    async fn health_check(&self) -> MigratorResult<()>;
}
