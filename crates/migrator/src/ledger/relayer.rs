//! JSON-RPC client for the signing relayer
//!
//! The relayer owns the migrator key, encodes the registry calls, submits
//! the transaction and waits for its receipt. This client only speaks two
//! methods:
//!
//! - `migrator_submit` with `[operation]`, returning an [`Outcome`]
//! - `migrator_health` with `[]`, returning anything non-error

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use scanner_migration_types::{LedgerOperation, Outcome};

use super::LedgerClient;
use crate::config::RelayerConfig;
use crate::error::{MigratorError, MigratorResult};

/// RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// RPC error structure
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

pub struct RelayerClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RelayerClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> MigratorResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| MigratorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &RelayerConfig) -> MigratorResult<Self> {
        Self::new(config.url.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a JSON-RPC call
    async fn call<T>(&self, method: &str, params: Value) -> MigratorResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params
        });

        debug!("RPC call: {}", method);

        let response = self
            .http
            .post(&self.url)
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;

        let rpc_response: RpcResponse<T> = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(MigratorError::TransientSubmission(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        rpc_response
            .result
            .ok_or_else(|| MigratorError::TransientSubmission("No result in RPC response".to_string()))
    }
}

#[async_trait]
impl LedgerClient for RelayerClient {
    async fn submit(&self, operation: &LedgerOperation) -> MigratorResult<Outcome> {
        self.call("migrator_submit", json!([operation])).await
    }

    async fn health_check(&self) -> MigratorResult<()> {
        let _: Value = self.call("migrator_health", json!([])).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RelayerClient::from_config(&RelayerConfig::default()).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:8545");
    }

    #[tokio::test]
    async fn test_unreachable_relayer_is_transient() {
        // Nothing listens on port 9 locally
        let client = RelayerClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, MigratorError::TransientSubmission(_)));
        assert!(!err.is_fatal());
    }
}
