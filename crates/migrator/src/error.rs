//! Error types for the migrator

use scanner_migration_types::GroupKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigratorError {
    /// Network failure, timeout, node rejection or revert. Nothing was persisted.
    #[error("Submission failed: {0}")]
    TransientSubmission(String),

    /// Pool mint failed or produced no usable pool signal. The group is skipped.
    #[error("Pool resolution failed for group {group}: {reason}")]
    GroupResolution { group: GroupKey, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Malformed data source: {0}")]
    DataSource(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigratorError {
    pub fn group_resolution(group: &GroupKey, reason: impl Into<String>) -> Self {
        Self::GroupResolution {
            group: group.clone(),
            reason: reason.into(),
        }
    }

    /// Fatal errors abort the whole run; everything else only abandons one group
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::DataSource(_) | Self::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for MigratorError {
    fn from(err: serde_json::Error) -> Self {
        MigratorError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for MigratorError {
    fn from(err: toml::de::Error) -> Self {
        MigratorError::Configuration(err.to_string())
    }
}

impl From<toml::ser::Error> for MigratorError {
    fn from(err: toml::ser::Error) -> Self {
        MigratorError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for MigratorError {
    fn from(err: validator::ValidationErrors) -> Self {
        MigratorError::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for MigratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MigratorError::TransientSubmission(format!("relayer timed out: {}", err))
        } else {
            MigratorError::TransientSubmission(err.to_string())
        }
    }
}

/// Result type alias for migrator operations
pub type MigratorResult<T> = Result<T, MigratorError>;
