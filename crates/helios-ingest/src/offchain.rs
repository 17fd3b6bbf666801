//! Simulated off-chain credit provider.
//!
//! Stands in for credit bureaus and valuation services. Returns a fixed,
//! realistic profile after a configurable latency.

use std::time::Duration;

use async_trait::async_trait;

use helios_core::constants::DEFAULT_OFFCHAIN_LATENCY;
use helios_core::error::SourceError;
use helios_core::traits::OffChainProvider;
use helios_core::types::{
    DefaultTrend, ExternalRatings, MarketConditions, OffChainFragment, RateEnvironment, VaultId,
};

#[derive(Debug, Clone)]
pub struct SimulatedCreditProvider {
    latency: Duration,
}

impl Default for SimulatedCreditProvider {
    fn default() -> Self {
        Self { latency: DEFAULT_OFFCHAIN_LATENCY }
    }
}

impl SimulatedCreditProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// The profile every simulated lookup returns.
    pub fn profile() -> OffChainFragment {
        OffChainFragment {
            average_credit_score: 720.0,
            weighted_ltv_ratio: 65.0,
            payment_history_score: 85.0,
            originator_reputation: Some(75.0),
            market_conditions: MarketConditions {
                interest_rate_environment: RateEnvironment::Rising,
                default_rate_trend: DefaultTrend::Stable,
                credit_spread_index: Some(120.0),
            },
            external_ratings: Some(ExternalRatings {
                moodys_equivalent: "Baa2".to_string(),
                sp_equivalent: "BBB".to_string(),
            }),
        }
    }
}

#[async_trait]
impl OffChainProvider for SimulatedCreditProvider {
    async fn credit_profile(&self, _vault_id: VaultId) -> Result<OffChainFragment, SourceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(Self::profile())
    }
}
