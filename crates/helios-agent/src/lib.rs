//! # helios-agent — Risk oracle composition.
//!
//! Wires ingestion, scoring, storage, and publication into a running agent:
//! - [`pipeline::Pipeline`] — fetch, score, persist, then publish in the background
//! - [`storage`] — RocksDB and in-memory score tables
//! - [`monitor::VaultMonitor`] — periodic re-assessment of watched vaults
//! - [`config::AgentConfig`] — agent configuration

pub mod config;
pub mod monitor;
pub mod pipeline;
pub mod storage;

pub use config::AgentConfig;
pub use monitor::{MonitorConfig, VaultMonitor, WatchedVault};
pub use pipeline::{Pipeline, PipelineConfig};
pub use storage::{MemoryScoreStore, RocksScoreStore};
