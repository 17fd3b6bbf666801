//! # helios-scoring — Weighted vault risk scoring.
//!
//! All calculations are pure and use integer arithmetic for the blend.
//!
//! The engine derives four sub-scores from a [`VaultSnapshot`]:
//! - **Asset diversity**: baseline plus a bonus per distinct asset type.
//! - **LTV**: step bands over the weighted loan-to-value ratio.
//! - **Originator reputation**: passed through from off-chain data.
//! - **Market conditions**: baseline adjusted by rate and default trends.
//!
//! and blends them with fixed weights into a score in `[0, 100]`.
//!
//! [`VaultSnapshot`]: helios_core::types::VaultSnapshot

pub mod engine;
pub mod factors;

pub use engine::{ScoringEngine, Weights};
