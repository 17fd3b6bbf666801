//! # helios-publisher — On-chain score publication.
//!
//! - [`signer`] — Ed25519 signing key loaded from the agent's secret
//! - [`payload`] — `risk_oracle` entry-function payloads and their encoding
//! - [`publisher`] — the capability-gated [`OraclePublisher`]
//!
//! Whether the publisher can submit transactions is decided once, when it is
//! built. Without a usable key or a reachable ledger it runs degraded and
//! reports every publication as simulated.

pub mod payload;
pub mod publisher;
pub mod signer;

pub use publisher::{OraclePublisher, PublisherConfig};
pub use signer::OracleSigner;
