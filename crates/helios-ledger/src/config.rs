//! Endpoint and timeout configuration for the ledger clients.

use std::time::Duration;

use helios_core::constants::{
    DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_HEALTH_TIMEOUT, DEFAULT_INDEXER_API_KEY,
    DEFAULT_INDEXER_URL, DEFAULT_LEDGER_URL, DEFAULT_REQUEST_TIMEOUT,
};

/// Fullnode REST API settings.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Base URL including the API version, e.g. `https://node/v1`.
    pub node_url: String,
    /// Timeout applied to every ordinary request.
    pub request_timeout: Duration,
    /// Timeout for the reachability probe.
    pub health_timeout: Duration,
    /// Overall deadline for a transaction to confirm.
    pub confirmation_timeout: Duration,
    /// Delay between confirmation polls while a transaction is pending.
    pub poll_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_LEDGER_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl LedgerConfig {
    /// URL for `path` under the node base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.node_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Event indexer settings.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub base_url: String,
    /// Sent as the `X-API-KEY` header.
    pub api_key: String,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDEXER_URL.to_string(),
            api_key: DEFAULT_INDEXER_API_KEY.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

impl IndexerConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
