//! Scanner migration CLI
//!
//! Loads scanner records, migrates every pending (owner, chain) group into
//! its pool and exits. Re-running is always safe: completed work is read
//! back from the checkpoint and skipped.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scanner_migrator::config::create_example_config;
use scanner_migrator::{
    JsonFileCheckpointStore, JsonFileDataSource, JsonFileStatusSink, MigrationOrchestrator, MigrationReport,
    MigratorConfig, MigratorError, Network, RelayerClient, RunSettings,
};

/// Fatal error before or outside the per-group loop
const EXIT_FATAL: u8 = 1;
/// `--strict` and some group failed or records are still pending
const EXIT_NOT_CONVERGED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "scanner-migrator")]
#[command(about = "Migrate scanners into scanner pools in resumable batches")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "migrator.toml")]
    config: PathBuf,

    /// Override the target network
    #[arg(short, long, value_enum)]
    network: Option<Network>,

    /// Override the number of scanners per ledger operation
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Override the scanner data source path
    #[arg(long)]
    data_source: Option<PathBuf>,

    /// Plan operations without submitting anything
    #[arg(long)]
    dry_run: bool,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Exit with status 2 unless every group converged
    #[arg(long)]
    strict: bool,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(path) = &cli.init_config {
        return match create_example_config(path) {
            Ok(()) => {
                println!("Wrote example configuration to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to write example configuration: {}", e);
                ExitCode::from(EXIT_FATAL)
            }
        };
    }

    let strict = cli.strict;
    match run(cli).await {
        Ok(report) if strict && !report.is_converged() => {
            warn!(
                "Migration did not converge: {} failed groups, {} pending scanners",
                report.failed_groups(),
                report.pending_records()
            );
            ExitCode::from(EXIT_NOT_CONVERGED)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Migration aborted: {:#}", e);
            eprintln!("Migration aborted: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> Result<MigrationReport> {
    let config_exists = cli.config.exists();
    let mut config = if config_exists {
        MigratorConfig::from_file(&cli.config)?
    } else {
        MigratorConfig::default()
    };

    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(path) = cli.data_source {
        config.data_source_path = path;
    }
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(log_level) = cli.log_level {
        config.logging.level = log_level;
    }

    init_logging(&config)?;

    if !config_exists {
        warn!("Config file not found, using defaults: {}", cli.config.display());
    }

    info!("Starting scanner migration");
    info!("Network: {}", config.network);
    info!("Data source: {}", config.data_source_path.display());
    info!("Relayer: {}", config.relayer.url);

    config.validate()?;
    config.ensure_directories()?;

    if config.dry_run {
        warn!("Running in DRY RUN mode - no operations will be submitted");
    }

    let store = JsonFileCheckpointStore::for_network(&config.checkpoint_dir, config.network)
        .await
        .context("opening checkpoint")?;
    info!("Checkpoint: {}", store.path().display());

    let ledger = RelayerClient::from_config(&config.relayer)?;
    let source = JsonFileDataSource::new(config.data_source_path.clone());
    let sink = JsonFileStatusSink::new(config.status_dir.clone());

    let orchestrator = MigrationOrchestrator::new(
        RunSettings::from(&config),
        Arc::new(store),
        Arc::new(ledger),
        Arc::new(source),
        Arc::new(sink),
    );

    // A stop signal is honored between chunks, never mid-submission
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, finishing the current operation");
            stop.cancel();
        }
    });

    Ok(orchestrator.run(&cancel).await?)
}

fn init_logging(config: &MigratorConfig) -> Result<()> {
    let level: tracing::Level = config
        .logging
        .level
        .parse()
        .map_err(|_| MigratorError::Configuration(format!("unknown log level '{}'", config.logging.level)))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("scanner_migrator={},scanner_migration_types={}", level, level).into());

    if config.logging.structured {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }

    Ok(())
}
