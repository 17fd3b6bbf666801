//! Deterministic fragments substituted when a source fails.

use serde_json::json;

use helios_core::types::{
    Asset, CompositionFragment, MarketConditions, OffChainFragment, OnChainFragment, TrancheState,
    VaultEvent, VaultId, VaultState,
};

pub const FALLBACK_TOTAL_VALUE: u64 = 5_000_000;
pub const FALLBACK_CREATED_TS: u64 = 1_700_000_000;

pub fn on_chain(vault_id: VaultId) -> OnChainFragment {
    OnChainFragment {
        vault: Some(VaultState {
            id: vault_id,
            total_value: FALLBACK_TOTAL_VALUE,
            created_ts: FALLBACK_CREATED_TS,
            assets: Vec::new(),
        }),
        tranches: Some(TrancheState {
            senior_supply: 3_000_000,
            mezz_supply: 1_500_000,
            junior_supply: 500_000,
        }),
        yield_state: None,
    }
}

pub fn events(vault_id: VaultId, owner: &str) -> Vec<VaultEvent> {
    vec![
        VaultEvent {
            event_type: "VaultCreated".to_string(),
            data: json!({ "vault_id": vault_id, "owner": owner }),
            sequence_number: None,
            timestamp: None,
        },
        VaultEvent {
            event_type: "RWAAdded".to_string(),
            data: json!({ "vault_id": vault_id, "value": 1_000_000 }),
            sequence_number: None,
            timestamp: None,
        },
    ]
}

pub fn composition() -> CompositionFragment {
    CompositionFragment {
        total_value: FALLBACK_TOTAL_VALUE,
        assets: vec![
            Asset {
                id: Some(1),
                asset_type: "invoice_financing".to_string(),
                value: 2_000_000,
                originator: Some("0xabc123".to_string()),
                risk_rating: Some("A".to_string()),
            },
            Asset {
                id: Some(2),
                asset_type: "real_estate_bridge".to_string(),
                value: 3_000_000,
                originator: Some("0xdef456".to_string()),
                risk_rating: Some("BB".to_string()),
            },
        ],
        created_ts: None,
    }
}

pub fn off_chain() -> OffChainFragment {
    OffChainFragment {
        average_credit_score: 720.0,
        weighted_ltv_ratio: 65.0,
        payment_history_score: 85.0,
        originator_reputation: Some(75.0),
        market_conditions: MarketConditions::default(),
        external_ratings: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composition_values_sum_to_total() {
        let c = composition();
        let sum: u64 = c.assets.iter().map(|a| a.value).sum();
        assert_eq!(sum, c.total_value);
        assert_eq!(c.distinct_asset_types(), 2);
    }

    #[test]
    fn on_chain_tranches_sum_to_total() {
        let f = on_chain(9);
        let vault = f.vault.unwrap();
        assert_eq!(vault.id, 9);
        assert_eq!(f.tranches.unwrap().total_supply(), vault.total_value);
    }

    #[test]
    fn events_carry_vault_and_owner() {
        let e = events(4, "0xabc");
        assert_eq!(e.len(), 2);
        assert_eq!(e[0].data["vault_id"], 4);
        assert_eq!(e[0].data["owner"], "0xabc");
        assert_eq!(e[1].event_type, "RWAAdded");
    }

    #[test]
    fn fallbacks_are_deterministic() {
        assert_eq!(composition(), composition());
        assert_eq!(off_chain(), off_chain());
        assert_eq!(events(1, "0x1"), events(1, "0x1"));
    }
}
