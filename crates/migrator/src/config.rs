//! Migrator configuration

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use scanner_migration_types::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

use crate::error::{MigratorError, MigratorResult};

/// Target network the migration runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Polygon,
    Mumbai,
    Local,
}

impl Network {
    /// Directory name used for per-network checkpoint and status documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Polygon => "polygon",
            Network::Mumbai => "mumbai",
            Network::Local => "local",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = MigratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polygon" | "matic" => Ok(Network::Polygon),
            "mumbai" => Ok(Network::Mumbai),
            "local" | "localhost" => Ok(Network::Local),
            other => Err(MigratorError::Configuration(format!("unknown network '{}'", other))),
        }
    }
}

/// Migrator configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MigratorConfig {
    /// Network whose registries are being migrated
    pub network: Network,

    /// Maximum scanners per submitted operation
    #[validate(range(min = 1, max = 1000))]
    pub chunk_size: usize,

    /// Scanner data document to migrate
    pub data_source_path: PathBuf,

    /// Directory holding one checkpoint document per network
    pub checkpoint_dir: PathBuf,

    /// Directory receiving status snapshots
    pub status_dir: PathBuf,

    /// Plan groups and chunks without submitting anything
    pub dry_run: bool,

    /// Signing relayer the ledger operations are sent to
    #[validate]
    pub relayer: RelayerConfig,

    /// Logging output
    pub logging: LoggingConfig,
}

/// Relayer connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RelayerConfig {
    #[validate(url)]
    pub url: String,

    /// Upper bound on a submission, including the confirmation wait
    #[validate(range(min = 1, max = 900))]
    pub timeout_secs: u64,
}

impl RelayerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub structured: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            network: Network::Polygon,
            chunk_size: DEFAULT_CHUNK_SIZE,
            data_source_path: "./data/scanners/matic/scanners.json".into(),
            checkpoint_dir: "./data/checkpoints".into(),
            status_dir: "./data/scanners".into(),
            dry_run: false,
            relayer: RelayerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: false,
        }
    }
}

impl MigratorConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> MigratorResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MigratorError::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: MigratorConfig = toml::from_str(&content).map_err(|e| {
            MigratorError::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> MigratorResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> MigratorResult<()> {
        Validate::validate(self)?;

        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(MigratorError::Configuration(format!(
                "chunk_size {} exceeds maximum {}",
                self.chunk_size, MAX_CHUNK_SIZE
            )));
        }

        for (name, path) in [
            ("data_source_path", &self.data_source_path),
            ("checkpoint_dir", &self.checkpoint_dir),
            ("status_dir", &self.status_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(MigratorError::Configuration(format!("{} cannot be empty", name)));
            }
        }

        Ok(())
    }

    /// Ensure checkpoint and status directories exist for the target network
    pub fn ensure_directories(&self) -> MigratorResult<()> {
        fs::create_dir_all(self.checkpoint_dir.join(self.network.as_str()))?;
        fs::create_dir_all(self.status_dir.join(self.network.as_str()))?;
        Ok(())
    }
}

/// Create example configuration file
pub fn create_example_config(path: impl AsRef<Path>) -> MigratorResult<()> {
    let example_config = MigratorConfig {
        network: Network::Mumbai,
        chunk_size: 50,
        data_source_path: "./data/scanners/mumbai/scanners.json".into(),
        relayer: RelayerConfig {
            url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 180,
        },
        ..MigratorConfig::default()
    };

    example_config.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = MigratorConfig::default();
        assert!(config.validate().is_ok());

        config.chunk_size = 0;
        assert!(config.validate().is_err());

        config.chunk_size = 100;
        config.relayer.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_applies_defaults() {
        let config: MigratorConfig = toml::from_str(
            r#"
network = "local"

[relayer]
timeout_secs = 30
"#,
        )
        .unwrap();

        assert_eq!(config.network, Network::Local);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.relayer.url, "http://127.0.0.1:8545");
        assert_eq!(config.relayer.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_network_names() {
        assert_eq!("matic".parse::<Network>().unwrap(), Network::Polygon);
        assert_eq!("Mumbai".parse::<Network>().unwrap(), Network::Mumbai);
        assert!("goerli".parse::<Network>().is_err());
        assert_eq!(Network::Local.to_string(), "local");
    }
}
