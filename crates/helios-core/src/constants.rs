//! Oracle constants: scoring weights, tier thresholds, and I/O defaults.
//!
//! Weights are expressed in percent so the blend stays in integer arithmetic.

use std::time::Duration;

/// Neutral score used for missing data and internal scoring failures.
pub const NEUTRAL_SCORE: u8 = 50;

/// Upper bound for every score and sub-score.
pub const MAX_SCORE: u8 = 100;

// --- Blend weights (percent) ---

pub const WEIGHT_ASSET_DIVERSITY: u32 = 20;
pub const WEIGHT_LTV_RATIO: u32 = 30;
pub const WEIGHT_ORIGINATOR_REPUTATION: u32 = 15;
pub const WEIGHT_MARKET_CONDITIONS: u32 = 15;
/// Declared in the risk schema but not yet wired into the blend.
pub const WEIGHT_PAYMENT_HISTORY: u32 = 10;
/// Declared in the risk schema but not yet wired into the blend.
pub const WEIGHT_CONCENTRATION_RISK: u32 = 10;

/// Denominator for the percent weights.
pub const WEIGHT_PRECISION: u32 = 100;

// --- Tier thresholds ---

/// Scores at or above this are `LOW` risk.
pub const LOW_RISK_THRESHOLD: u8 = 80;
/// Scores at or above this (and below [`LOW_RISK_THRESHOLD`]) are `MEDIUM` risk.
pub const MEDIUM_RISK_THRESHOLD: u8 = 60;

// --- Sub-score parameters ---

/// Diversity baseline before per-type bonuses.
pub const DIVERSITY_BASELINE: u32 = 50;
/// Diversity bonus per distinct asset type.
pub const DIVERSITY_PER_TYPE: u32 = 10;

/// Market score before environment adjustments.
pub const MARKET_BASELINE: i32 = 70;
pub const MARKET_RATES_RISING: i32 = -10;
pub const MARKET_RATES_FALLING: i32 = 5;
pub const MARKET_DEFAULTS_INCREASING: i32 = -15;
pub const MARKET_DEFAULTS_DECREASING: i32 = 10;

// --- Ledger / oracle module ---

/// Move module holding the on-chain oracle.
pub const ORACLE_MODULE: &str = "risk_oracle";
pub const FN_UPDATE_SCORE: &str = "update_health_score";
pub const FN_UPDATE_SCORE_WITH_FACTORS: &str = "update_health_score_with_factors";
pub const FN_INIT: &str = "init";

/// Placeholder oracle module address used when none is configured.
pub const DEFAULT_MODULE_ADDRESS: &str =
    "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

/// Resource struct names the on-chain reader understands.
pub const RESOURCE_VAULT: &str = "Vault";
pub const RESOURCE_TRANCHE_VAULT: &str = "TrancheVault";
pub const RESOURCE_YIELD_STATE: &str = "YieldState";

// --- I/O defaults ---

pub const DEFAULT_LEDGER_URL: &str = "https://fullnode.testnet.aptoslabs.com/v1";
pub const DEFAULT_INDEXER_URL: &str = "https://aptos-testnet.nodit.io/v1";
pub const DEFAULT_INDEXER_API_KEY: &str = "demo_key";

/// Page size when listing vault events.
pub const DEFAULT_EVENT_LIMIT: u32 = 100;

/// Per-request timeout for ledger and indexer calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for reachability probes.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on one source fetch inside the aggregator.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(15);
/// How long to wait for a submitted transaction to confirm.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Delay between consecutive submissions in a batch publish.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);
/// Simulated latency of the off-chain credit provider.
pub const DEFAULT_OFFCHAIN_LATENCY: Duration = Duration::from_millis(100);
/// Transaction expiry window.
pub const TX_EXPIRATION_SECS: u64 = 600;

/// Default bind address for the agent HTTP service.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
