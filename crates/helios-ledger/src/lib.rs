//! # helios-ledger — REST access to the ledger and its event indexer.
//!
//! - [`LedgerRestClient`] — implements [`ChainClient`](helios_core::traits::ChainClient)
//!   against a fullnode REST API
//! - [`IndexerRestClient`] — implements
//!   [`EventIndexClient`](helios_core::traits::EventIndexClient) against an
//!   account-events API keyed by `X-API-KEY`
//! - [`config`] — endpoints and timeouts

pub mod config;
pub mod indexer;
pub mod rest;

pub use config::{IndexerConfig, LedgerConfig};
pub use indexer::IndexerRestClient;
pub use rest::LedgerRestClient;
