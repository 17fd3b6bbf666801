//! Helios agent binary.
//!
//! Serves the risk oracle HTTP API, persists scores in RocksDB (or memory
//! with `--ephemeral`), publishes scores on-chain when a signing key is
//! available, and keeps `--watch`ed vaults re-assessed in the background.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use helios_agent_lib::{
    AgentConfig, MemoryScoreStore, MonitorConfig, Pipeline, RocksScoreStore, VaultMonitor,
    WatchedVault,
};
use helios_core::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_INDEXER_URL, DEFAULT_LEDGER_URL, DEFAULT_MODULE_ADDRESS,
};
use helios_core::traits::{ChainClient, EventIndexClient, Storage};
use helios_core::types::CapabilityState;
use helios_ingest::{Aggregator, SimulatedCreditProvider};
use helios_ledger::{IndexerConfig, IndexerRestClient, LedgerConfig, LedgerRestClient};
use helios_publisher::{OraclePublisher, PublisherConfig};
use helios_scoring::ScoringEngine;

mod routes;

/// Environment variable holding the oracle signing key.
const ENV_PRIVATE_KEY: &str = "HELIOS_AGENT_PRIVATE_KEY";
/// Environment variable holding the event indexer API key.
const ENV_INDEXER_API_KEY: &str = "NODIT_API_KEY";

/// Shared application state passed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Helios risk oracle agent.
#[derive(Parser, Debug)]
#[command(name = "helios-agent", version, about = "Risk oracle agent for real-world-asset vaults")]
struct Args {
    /// Data directory for the score database
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep scores in memory only
    #[arg(long)]
    ephemeral: bool,

    /// HTTP bind address
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Ledger fullnode REST URL
    #[arg(long, env = "APTOS_NODE_URL", default_value = DEFAULT_LEDGER_URL)]
    node_url: String,

    /// Event indexer REST URL
    #[arg(long, default_value = DEFAULT_INDEXER_URL)]
    indexer_url: String,

    /// Address the risk_oracle module is published under
    #[arg(long, env = "STRATAFI_ADDR", default_value = DEFAULT_MODULE_ADDRESS)]
    module_address: String,

    /// Allowed CORS origins (comma-separated, "*" for any)
    #[arg(long, value_delimiter = ',', default_value = "http://localhost:3000,http://localhost:3001")]
    cors_origins: Vec<String>,

    /// Vaults to re-assess periodically, as id:owner (comma-separated)
    #[arg(long, value_delimiter = ',')]
    watch: Vec<WatchedVault>,

    /// Seconds between re-assessments of watched vaults
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    watch_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    /// Convert CLI args into an AgentConfig.
    fn into_config(self, indexer_api_key: Option<String>) -> (AgentConfig, Vec<WatchedVault>, String) {
        let defaults = AgentConfig::default();
        let config = AgentConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            ephemeral: self.ephemeral,
            bind_addr: self.bind,
            cors_origins: self.cors_origins,
            log_level: self.log_level,
            ledger: LedgerConfig { node_url: self.node_url, ..LedgerConfig::default() },
            indexer: IndexerConfig {
                base_url: self.indexer_url,
                api_key: indexer_api_key.unwrap_or(defaults.indexer.api_key),
                ..IndexerConfig::default()
            },
            publisher: PublisherConfig { module_address: self.module_address, ..PublisherConfig::default() },
            monitor: MonitorConfig {
                interval: Duration::from_secs(self.watch_interval_secs),
                ..MonitorConfig::default()
            },
            aggregator: defaults.aggregator,
            pipeline: defaults.pipeline,
        };
        (config, self.watch, self.log_format)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let indexer_api_key = std::env::var(ENV_INDEXER_API_KEY).ok();
    let private_key = std::env::var(ENV_PRIVATE_KEY).ok();
    let (config, watch, log_format) = args.into_config(indexer_api_key);

    init_logging(&config.log_level, &log_format);

    info!("Helios Risk Oracle v{}", env!("CARGO_PKG_VERSION"));
    info!(
        node = %config.ledger.node_url,
        indexer = %config.indexer.base_url,
        bind = %config.bind_addr,
        ephemeral = config.ephemeral,
        "starting agent"
    );

    // Collaborators.
    let chain: Arc<dyn ChainClient> = Arc::new(
        LedgerRestClient::new(config.ledger.clone()).context("Failed to build ledger client")?,
    );
    let index: Arc<dyn EventIndexClient> = Arc::new(
        IndexerRestClient::new(config.indexer.clone()).context("Failed to build indexer client")?,
    );
    let storage = open_storage(&config)?;

    let publisher = OraclePublisher::detect(
        config.publisher.clone(),
        private_key.as_deref(),
        Some(Arc::clone(&chain)),
    )
    .await;
    match publisher.state() {
        CapabilityState::Live => info!(capability = %publisher.state(), "publisher ready"),
        CapabilityState::Degraded => warn!(
            capability = %publisher.state(),
            reason = publisher.degraded_reason().unwrap_or_default(),
            "publisher degraded, scores will not be published on-chain"
        ),
    }

    let aggregator = Aggregator::new(
        Arc::clone(&chain),
        Arc::clone(&index),
        Arc::new(SimulatedCreditProvider::default()),
        config.aggregator.clone(),
    );
    let pipeline = Arc::new(Pipeline::new(
        aggregator,
        ScoringEngine::new(),
        storage,
        Arc::new(publisher),
        chain,
        index,
        config.pipeline.clone(),
    ));

    // Background monitors.
    let monitor = VaultMonitor::new(Arc::clone(&pipeline), config.monitor.clone());
    let watchers = monitor.spawn(watch);
    if !watchers.is_empty() {
        info!(vaults = watchers.len(), "vault monitor started");
    }

    // HTTP API.
    let app = routes::router(AppState { pipeline }, &config.cors_origins);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    monitor.shutdown();
    for watcher in watchers {
        if let Err(e) = watcher.await {
            error!(error = %e, "monitor task panicked");
        }
    }
    info!("Helios agent shutdown complete");
    Ok(())
}

fn open_storage(config: &AgentConfig) -> Result<Arc<dyn Storage>> {
    if config.ephemeral {
        info!("using in-memory score table");
        return Ok(Arc::new(MemoryScoreStore::new()));
    }
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data_dir {}", config.data_dir.display()))?;
    let store = RocksScoreStore::open(config.db_path())
        .with_context(|| format!("Failed to open score database at {}", config.db_path().display()))?;
    info!(path = %config.db_path().display(), "score database opened");
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down..."),
        Err(e) => error!(error = %e, "failed to listen for Ctrl+C"),
    }
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
