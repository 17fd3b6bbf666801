//! Agent configuration.
//!
//! [`AgentConfig`] gathers every component's settings. The binary fills it
//! from CLI flags; secrets (signing key, indexer API key) are read from the
//! environment by the binary and never stored here.

use std::path::PathBuf;

use helios_core::constants::DEFAULT_BIND_ADDR;
use helios_ingest::AggregatorConfig;
use helios_ledger::{IndexerConfig, LedgerConfig};
use helios_publisher::PublisherConfig;

use crate::monitor::MonitorConfig;
use crate::pipeline::PipelineConfig;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Root directory for persistent data.
    pub data_dir: PathBuf,
    /// Keep scores in memory only.
    pub ephemeral: bool,
    /// Socket address for the HTTP API.
    pub bind_addr: String,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Log level filter string (e.g. "info", "helios_ingest=debug").
    pub log_level: String,
    pub ledger: LedgerConfig,
    pub indexer: IndexerConfig,
    pub aggregator: AggregatorConfig,
    pub publisher: PublisherConfig,
    pub pipeline: PipelineConfig,
    pub monitor: MonitorConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("helios");

        Self {
            data_dir,
            ephemeral: false,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
            log_level: "info".to_string(),
            ledger: LedgerConfig::default(),
            indexer: IndexerConfig::default(),
            aggregator: AggregatorConfig::default(),
            publisher: PublisherConfig::default(),
            pipeline: PipelineConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Path to the RocksDB score table.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("scores")
    }
}
