//! Oracle data model: vault snapshots, score results, publication results.
//!
//! Ledger JSON encodes 64-bit integers as strings, so every integer read from
//! the ledger goes through the lenient deserializers in [`lenient`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::AccountAddress;
use crate::constants::{LOW_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD, NEUTRAL_SCORE};

/// Numeric vault identifier.
pub type VaultId = u64;

// ---------------------------------------------------------------------------
// Ledger resources
// ---------------------------------------------------------------------------

/// One raw resource stored under a ledger account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LedgerResource {
    /// Fully qualified type tag, e.g. `0xabc::vault::Vault`.
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub data: Value,
}

impl LedgerResource {
    /// Struct name of the type tag with module path and generics stripped.
    ///
    /// `0xabc::tranche::TrancheVault<0x1::coin::Coin>` -> `TrancheVault`.
    pub fn struct_name(&self) -> &str {
        let base = self.type_tag.split('<').next().unwrap_or_default();
        base.rsplit("::").next().unwrap_or(base).trim()
    }
}

/// The `Vault` resource: totals and asset list for one vault.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VaultState {
    #[serde(deserialize_with = "lenient::u64")]
    pub id: VaultId,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total_value: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub created_ts: u64,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// The `TrancheVault` resource: outstanding supply per tranche.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TrancheState {
    #[serde(default, deserialize_with = "lenient::u64")]
    pub senior_supply: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub mezz_supply: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub junior_supply: u64,
}

impl TrancheState {
    pub fn total_supply(&self) -> u64 {
        self.senior_supply
            .saturating_add(self.mezz_supply)
            .saturating_add(self.junior_supply)
    }
}

/// A single real-world asset held by a vault.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub id: Option<u64>,
    #[serde(rename = "type", default = "unknown_asset_type")]
    pub asset_type: String,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub value: u64,
    #[serde(default)]
    pub originator: Option<String>,
    #[serde(default)]
    pub risk_rating: Option<String>,
}

fn unknown_asset_type() -> String {
    "unknown".to_string()
}

// ---------------------------------------------------------------------------
// Snapshot fragments
// ---------------------------------------------------------------------------

/// Which source produced a fragment. Used for logging only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    OnChain,
    Events,
    Composition,
    OffChain,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OnChain => "on_chain",
            Self::Events => "events",
            Self::Composition => "composition",
            Self::OffChain => "off_chain",
        };
        f.write_str(name)
    }
}

/// Ledger resources of the vault owner, classified by type.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OnChainFragment {
    pub vault: Option<VaultState>,
    pub tranches: Option<TrancheState>,
    pub yield_state: Option<Value>,
}

/// An indexed ledger event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VaultEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub sequence_number: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl VaultEvent {
    /// Whether the event type mentions a vault (case-insensitive).
    pub fn is_vault_related(&self) -> bool {
        self.event_type.to_ascii_lowercase().contains("vault")
    }
}

/// Current asset composition of a vault.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CompositionFragment {
    pub total_value: u64,
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub created_ts: Option<u64>,
}

impl CompositionFragment {
    /// Number of distinct asset types held.
    pub fn distinct_asset_types(&self) -> usize {
        let mut types: Vec<&str> = self.assets.iter().map(|a| a.asset_type.as_str()).collect();
        types.sort_unstable();
        types.dedup();
        types.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RateEnvironment {
    Rising,
    Falling,
    #[default]
    Stable,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DefaultTrend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MarketConditions {
    #[serde(default)]
    pub interest_rate_environment: RateEnvironment,
    #[serde(default)]
    pub default_rate_trend: DefaultTrend,
    #[serde(default)]
    pub credit_spread_index: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExternalRatings {
    pub moodys_equivalent: String,
    pub sp_equivalent: String,
}

/// Credit data about the vault's underlying borrowers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OffChainFragment {
    pub average_credit_score: f64,
    /// Weighted loan-to-value ratio, percent.
    pub weighted_ltv_ratio: f64,
    pub payment_history_score: f64,
    #[serde(default)]
    pub originator_reputation: Option<f64>,
    #[serde(default)]
    pub market_conditions: MarketConditions,
    #[serde(default)]
    pub external_ratings: Option<ExternalRatings>,
}

/// Everything known about one vault at assessment time.
///
/// Any fragment may be a fallback value; the snapshot does not record which.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VaultSnapshot {
    pub vault_id: VaultId,
    pub owner_address: String,
    pub on_chain: OnChainFragment,
    pub events: Vec<VaultEvent>,
    pub composition: CompositionFragment,
    pub off_chain: OffChainFragment,
    pub captured_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// The four sub-scores that feed the blend, each in `[0, 100]`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiskFactors {
    pub asset_diversity: u8,
    pub ltv_ratio: u8,
    pub originator_reputation: u8,
    pub market_conditions: u8,
}

impl RiskFactors {
    /// All factors at the neutral score.
    pub const fn neutral() -> Self {
        Self {
            asset_diversity: NEUTRAL_SCORE,
            ltv_ratio: NEUTRAL_SCORE,
            originator_reputation: NEUTRAL_SCORE,
            market_conditions: NEUTRAL_SCORE,
        }
    }

    pub fn as_array(&self) -> [u8; 4] {
        [
            self.asset_diversity,
            self.ltv_ratio,
            self.originator_reputation,
            self.market_conditions,
        ]
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(score: u8) -> Self {
        if score >= LOW_RISK_THRESHOLD {
            Self::Low
        } else if score >= MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Low => "Strong investment opportunity with minimal risk.",
            Self::Medium => "Balanced risk-reward profile.",
            Self::High => "Higher risk profile detected.",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.write_str(name)
    }
}

/// Recommendation attached to the neutral result.
pub const NEUTRAL_RECOMMENDATION: &str = "Unable to calculate precise score";

/// Output of the scoring engine; the unit that gets persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScoreResult {
    pub vault_id: VaultId,
    pub score: u8,
    #[serde(rename = "risk_factors")]
    pub factors: RiskFactors,
    #[serde(rename = "risk_level")]
    pub risk_tier: RiskTier,
    pub recommendation: String,
    #[serde(rename = "timestamp")]
    pub computed_at: DateTime<Utc>,
    /// Diagnostic detail when the neutral result was substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScoreResult {
    /// The canonical neutral result.
    pub fn neutral(vault_id: VaultId, computed_at: DateTime<Utc>, error: Option<String>) -> Self {
        Self {
            vault_id,
            score: NEUTRAL_SCORE,
            factors: RiskFactors::neutral(),
            risk_tier: RiskTier::Medium,
            recommendation: NEUTRAL_RECOMMENDATION.to_string(),
            computed_at,
            error,
        }
    }
}

/// Aggregate view over the score table.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ScoreStats {
    pub count: u64,
    pub average: Option<f64>,
    pub max_timestamp: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Publication
// ---------------------------------------------------------------------------

/// Fixed at startup: whether publication can reach the ledger.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CapabilityState {
    Live,
    Degraded,
}

impl fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "LIVE",
            Self::Degraded => "DEGRADED",
        })
    }
}

/// One score to publish.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublishRequest {
    pub vault_owner: String,
    pub score: u8,
    #[serde(default)]
    pub risk_factors: Option<RiskFactors>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Success,
    Simulated,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PublicationResult {
    pub status: PublicationStatus,
    pub vault_owner: String,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_factors: Option<RiskFactors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PublicationResult {
    pub fn simulated(req: &PublishRequest, message: impl Into<String>) -> Self {
        Self {
            status: PublicationStatus::Simulated,
            vault_owner: req.vault_owner.clone(),
            score: req.score,
            risk_factors: req.risk_factors,
            transaction_ref: None,
            gas_used: None,
            error_detail: None,
            message: Some(message.into()),
        }
    }

    pub fn success(req: &PublishRequest, transaction_ref: String, gas_used: u64) -> Self {
        Self {
            status: PublicationStatus::Success,
            vault_owner: req.vault_owner.clone(),
            score: req.score,
            risk_factors: req.risk_factors,
            transaction_ref: Some(transaction_ref),
            gas_used: Some(gas_used),
            error_detail: None,
            message: None,
        }
    }

    pub fn error(req: &PublishRequest, detail: impl Into<String>) -> Self {
        Self {
            status: PublicationStatus::Error,
            vault_owner: req.vault_owner.clone(),
            score: req.score,
            risk_factors: req.risk_factors,
            transaction_ref: None,
            gas_used: None,
            error_detail: Some(detail.into()),
            message: None,
        }
    }
}

/// A signed transaction ready for submission. The payload bytes are opaque
/// to everything except the ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SignedPayload {
    pub sender: AccountAddress,
    /// Encoded raw transaction, hex.
    pub raw_txn: String,
    /// Ed25519 public key, hex.
    pub public_key: String,
    /// Ed25519 signature over the signing message, hex.
    pub signature: String,
}

/// Confirmation details for a committed transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_ref: String,
    pub gas_used: u64,
    #[serde(default)]
    pub version: Option<u64>,
}

/// Health summary exposed to the host service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ServiceStatus {
    pub capability_state: CapabilityState,
    pub chain_reachable: bool,
    pub index_reachable: bool,
}

// ---------------------------------------------------------------------------
// Lenient integer decoding
// ---------------------------------------------------------------------------

/// Deserializers accepting integers as JSON numbers or decimal strings.
pub mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn from_value<E: Error>(v: &Value) -> Result<Option<u64>, E> {
        match v {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| E::custom(format!("expected unsigned integer, got {n}"))),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| E::custom(format!("expected integer string, got {s:?}"))),
            other => Err(E::custom(format!("expected integer, got {other}"))),
        }
    }

    pub fn u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(from_value(&v)?.unwrap_or(0))
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let v = Value::deserialize(d)?;
        from_value(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn struct_name_strips_path_and_generics() {
        let r = LedgerResource {
            type_tag: "0xabc::tranche::TrancheVault<0x1::coin::Coin>".into(),
            data: Value::Null,
        };
        assert_eq!(r.struct_name(), "TrancheVault");

        let r = LedgerResource { type_tag: "Vault".into(), data: Value::Null };
        assert_eq!(r.struct_name(), "Vault");
    }

    #[test]
    fn vault_state_accepts_string_integers() {
        let v: VaultState = serde_json::from_value(json!({
            "id": "7",
            "total_value": "5000000",
            "created_ts": 1700000000,
            "assets": [{"id": "1", "type": "invoice", "value": "2000000"}]
        }))
        .unwrap();
        assert_eq!(v.id, 7);
        assert_eq!(v.total_value, 5_000_000);
        assert_eq!(v.assets[0].id, Some(1));
        assert_eq!(v.assets[0].value, 2_000_000);
    }

    #[test]
    fn vault_state_rejects_non_numeric_total() {
        let r: Result<VaultState, _> =
            serde_json::from_value(json!({"id": 1, "total_value": "lots"}));
        assert!(r.is_err());
    }

    #[test]
    fn asset_type_defaults_to_unknown() {
        let a: Asset = serde_json::from_value(json!({"value": 10})).unwrap();
        assert_eq!(a.asset_type, "unknown");
    }

    #[test]
    fn distinct_asset_types_dedups() {
        let asset = |t: &str| Asset {
            id: None,
            asset_type: t.into(),
            value: 1,
            originator: None,
            risk_rating: None,
        };
        let c = CompositionFragment {
            total_value: 3,
            assets: vec![asset("invoice"), asset("real_estate"), asset("invoice")],
            created_ts: None,
        };
        assert_eq!(c.distinct_asset_types(), 2);
    }

    #[test]
    fn vault_related_is_case_insensitive() {
        let e = |t: &str| VaultEvent {
            event_type: t.into(),
            data: Value::Null,
            sequence_number: None,
            timestamp: None,
        };
        assert!(e("0x1::vault::VaultCreated").is_vault_related());
        assert!(e("TrancheVaultMinted").is_vault_related());
        assert!(!e("0x1::coin::DepositEvent").is_vault_related());
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(RiskTier::from_score(100), RiskTier::Low);
        assert_eq!(RiskTier::from_score(80), RiskTier::Low);
        assert_eq!(RiskTier::from_score(79), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(60), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(59), RiskTier::High);
        assert_eq!(RiskTier::from_score(0), RiskTier::High);
    }

    #[test]
    fn score_result_uses_api_field_names() {
        let r = ScoreResult::neutral(3, Utc::now(), None);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["risk_level"], "MEDIUM");
        assert_eq!(v["risk_factors"]["ltv_ratio"], 50);
        assert!(v.get("error").is_none());
    }

    #[test]
    fn market_conditions_parse_lowercase() {
        let m: MarketConditions = serde_json::from_value(json!({
            "interest_rate_environment": "rising",
            "default_rate_trend": "decreasing",
            "credit_spread_index": 120
        }))
        .unwrap();
        assert_eq!(m.interest_rate_environment, RateEnvironment::Rising);
        assert_eq!(m.default_rate_trend, DefaultTrend::Decreasing);
        assert_eq!(m.credit_spread_index, Some(120.0));
    }

    #[test]
    fn publication_status_serializes_lowercase() {
        let req = PublishRequest { vault_owner: "0x1".into(), score: 61, risk_factors: None };
        let v = serde_json::to_value(PublicationResult::simulated(&req, "mock")).unwrap();
        assert_eq!(v["status"], "simulated");
        assert!(v.get("transaction_ref").is_none());
    }
}
