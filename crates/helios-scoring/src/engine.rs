//! The scoring engine: [`VaultSnapshot`] in, [`ScoreResult`] out.
//!
//! The blend is computed in integer percent-points:
//! `sum(factor * weight)` with weights in percent, then divided by
//! [`WEIGHT_PRECISION`] rounding half up. Only four of the six declared
//! weights are applied, so a snapshot with every factor at 100 scores 80.

use tracing::warn;

use helios_core::constants::{
    MAX_SCORE, WEIGHT_ASSET_DIVERSITY, WEIGHT_CONCENTRATION_RISK, WEIGHT_LTV_RATIO,
    WEIGHT_MARKET_CONDITIONS, WEIGHT_ORIGINATOR_REPUTATION, WEIGHT_PAYMENT_HISTORY,
    WEIGHT_PRECISION,
};
use helios_core::error::ScoringError;
use helios_core::types::{RiskFactors, RiskTier, ScoreResult, VaultSnapshot};

use crate::factors;

/// Blend weights in percent.
///
/// `payment_history` and `concentration_risk` are part of the declared risk
/// schema but are not consulted by [`Weights::blend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weights {
    pub asset_diversity: u32,
    pub ltv_ratio: u32,
    pub originator_reputation: u32,
    pub market_conditions: u32,
    pub payment_history: u32,
    pub concentration_risk: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            asset_diversity: WEIGHT_ASSET_DIVERSITY,
            ltv_ratio: WEIGHT_LTV_RATIO,
            originator_reputation: WEIGHT_ORIGINATOR_REPUTATION,
            market_conditions: WEIGHT_MARKET_CONDITIONS,
            payment_history: WEIGHT_PAYMENT_HISTORY,
            concentration_risk: WEIGHT_CONCENTRATION_RISK,
        }
    }
}

impl Weights {
    /// Sum of all declared weights.
    pub fn declared_total(&self) -> u32 {
        self.applied_total() + self.payment_history + self.concentration_risk
    }

    /// Sum of the weights the blend actually uses.
    pub fn applied_total(&self) -> u32 {
        self.asset_diversity + self.ltv_ratio + self.originator_reputation + self.market_conditions
    }

    /// Weighted blend of the four factors, rounded half up and clamped to `[0, 100]`.
    ///
    /// This is not truncation: a blend of 60.5 scores 61, not 60.
    pub fn blend(&self, f: &RiskFactors) -> u8 {
        let weighted = u32::from(f.asset_diversity) * self.asset_diversity
            + u32::from(f.ltv_ratio) * self.ltv_ratio
            + u32::from(f.originator_reputation) * self.originator_reputation
            + u32::from(f.market_conditions) * self.market_conditions;
        let rounded = (weighted + WEIGHT_PRECISION / 2) / WEIGHT_PRECISION;
        rounded.min(u32::from(MAX_SCORE)) as u8
    }
}

/// Pure, stateless risk scorer.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: Weights,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Compute the four sub-scores, failing on a malformed fragment.
    pub fn factors(&self, snapshot: &VaultSnapshot) -> Result<RiskFactors, ScoringError> {
        let off_chain = &snapshot.off_chain;
        Ok(RiskFactors {
            asset_diversity: factors::asset_diversity(&snapshot.composition),
            ltv_ratio: factors::ltv(off_chain.weighted_ltv_ratio)?,
            originator_reputation: factors::originator_reputation(off_chain.originator_reputation)?,
            market_conditions: factors::market_conditions(&off_chain.market_conditions),
        })
    }

    /// Score a snapshot, failing on a malformed fragment.
    pub fn try_score(&self, snapshot: &VaultSnapshot) -> Result<ScoreResult, ScoringError> {
        let factors = self.factors(snapshot)?;
        let score = self.weights.blend(&factors);
        let risk_tier = RiskTier::from_score(score);
        Ok(ScoreResult {
            vault_id: snapshot.vault_id,
            score,
            factors,
            risk_tier,
            recommendation: risk_tier.recommendation().to_string(),
            computed_at: snapshot.captured_at,
            error: None,
        })
    }

    /// Score a snapshot. Never fails: a malformed fragment yields the neutral
    /// result with the error attached.
    ///
    /// `computed_at` is taken from the snapshot, so scoring the same snapshot
    /// twice gives identical results.
    pub fn score(&self, snapshot: &VaultSnapshot) -> ScoreResult {
        match self.try_score(snapshot) {
            Ok(result) => result,
            Err(e) => {
                warn!(vault_id = snapshot.vault_id, error = %e, "scoring: substituting neutral result");
                ScoreResult::neutral(snapshot.vault_id, snapshot.captured_at, Some(e.to_string()))
            }
        }
    }
}
