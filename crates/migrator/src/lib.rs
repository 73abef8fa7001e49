//! Resumable, batched migration of scanner records into scanner pools
//!
//! Scanners are grouped by (owner, chain), each group gets exactly one pool,
//! and records move into it in bounded chunks. Every confirmed step is
//! checkpointed so an interrupted run picks up where it stopped.

pub mod checkpoint;
pub mod chunker;
pub mod config;
pub mod error;
pub mod grouper;
pub mod ledger;
pub mod orchestrator;
pub mod pool_resolver;
pub mod report;
pub mod sink;
pub mod source;
pub mod submitter;
pub mod verifier;

pub use checkpoint::{CheckpointStore, CheckpointStoreExt, JsonFileCheckpointStore, MemoryCheckpointStore};
pub use config::{LoggingConfig, MigratorConfig, Network, RelayerConfig};
pub use error::{MigratorError, MigratorResult};
pub use ledger::{LedgerClient, RelayerClient};
pub use orchestrator::{MigrationOrchestrator, RunSettings};
pub use pool_resolver::{PoolResolution, PoolResolver};
pub use report::{GroupReport, GroupStatus, MigrationReport};
pub use sink::{JsonFileStatusSink, StatusSink, StatusSnapshot};
pub use source::{DataSource, JsonFileDataSource};
pub use submitter::{BatchSubmitter, Submission};
pub use verifier::{OutcomeVerifier, PoolSignal, Verification};
