//! Individual risk sub-scores. Each returns a value in `[0, 100]`.

use helios_core::constants::{
    DIVERSITY_BASELINE, DIVERSITY_PER_TYPE, MARKET_BASELINE, MARKET_DEFAULTS_DECREASING,
    MARKET_DEFAULTS_INCREASING, MARKET_RATES_FALLING, MARKET_RATES_RISING, MAX_SCORE,
    NEUTRAL_SCORE,
};
use helios_core::error::ScoringError;
use helios_core::types::{CompositionFragment, DefaultTrend, MarketConditions, RateEnvironment};

/// LTV bands as `(upper bound inclusive, score)`, checked in order.
const LTV_BANDS: [(f64, u8); 4] = [(50.0, 100), (65.0, 85), (75.0, 70), (85.0, 50)];

fn require_finite_non_negative(field: &'static str, value: f64) -> Result<f64, ScoringError> {
    if !value.is_finite() {
        return Err(ScoringError::MalformedFragment {
            field,
            reason: format!("non-finite value {value}"),
        });
    }
    if value < 0.0 {
        return Err(ScoringError::MalformedFragment {
            field,
            reason: format!("negative value {value}"),
        });
    }
    Ok(value)
}

/// Diversity: neutral when there is nothing to diversify over, otherwise
/// baseline plus a bonus per distinct asset type, capped at 100.
///
/// A zero `total_value` also yields the neutral score.
pub fn asset_diversity(composition: &CompositionFragment) -> u8 {
    if composition.assets.is_empty() || composition.total_value == 0 {
        return NEUTRAL_SCORE;
    }
    let types = composition.distinct_asset_types().min(u32::MAX as usize) as u32;
    let score = DIVERSITY_BASELINE.saturating_add(DIVERSITY_PER_TYPE.saturating_mul(types));
    score.min(u32::from(MAX_SCORE)) as u8
}

/// LTV: monotone non-increasing step function of the weighted ratio.
pub fn ltv(weighted_ltv_ratio: f64) -> Result<u8, ScoringError> {
    let ratio = require_finite_non_negative("weighted_ltv_ratio", weighted_ltv_ratio)?;
    for (upper, score) in LTV_BANDS {
        if ratio <= upper {
            return Ok(score);
        }
    }
    // Above the last band `100 - ratio` is already below 15.
    Ok((100.0 - ratio).max(0.0) as u8)
}

/// Reputation: pass-through, neutral when unknown.
pub fn originator_reputation(reputation: Option<f64>) -> Result<u8, ScoringError> {
    match reputation {
        None => Ok(NEUTRAL_SCORE),
        Some(r) => {
            let r = require_finite_non_negative("originator_reputation", r)?;
            Ok(r.min(f64::from(MAX_SCORE)) as u8)
        }
    }
}

/// Market: baseline adjusted by the rate environment and default trend.
pub fn market_conditions(market: &MarketConditions) -> u8 {
    let mut score = MARKET_BASELINE;
    score += match market.interest_rate_environment {
        RateEnvironment::Rising => MARKET_RATES_RISING,
        RateEnvironment::Falling => MARKET_RATES_FALLING,
        RateEnvironment::Stable => 0,
    };
    score += match market.default_rate_trend {
        DefaultTrend::Increasing => MARKET_DEFAULTS_INCREASING,
        DefaultTrend::Decreasing => MARKET_DEFAULTS_DECREASING,
        DefaultTrend::Stable => 0,
    };
    score.clamp(0, i32::from(MAX_SCORE)) as u8
}
