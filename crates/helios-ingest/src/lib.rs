//! # helios-ingest — Vault data acquisition.
//!
//! Builds a [`VaultSnapshot`](helios_core::types::VaultSnapshot) from four
//! independent sources:
//! - [`sources::OnChainSource`] — ledger resources classified by type
//! - [`sources::EventSource`] — vault-related indexed events
//! - [`sources::CompositionSource`] — the vault's asset list and total value
//! - [`sources::OffChainSource`] — credit data from an [`OffChainProvider`]
//!
//! The [`Aggregator`] runs them concurrently and substitutes the documented
//! [`fallback`] fragment for any source that errors or times out, so a fetch
//! always produces a complete snapshot.
//!
//! [`OffChainProvider`]: helios_core::traits::OffChainProvider

pub mod aggregator;
pub mod fallback;
pub mod offchain;
pub mod sources;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use offchain::SimulatedCreditProvider;
pub use sources::SourceClient;
