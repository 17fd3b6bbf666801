//! Per-source fetchers. Each produces one fragment of a vault snapshot and
//! knows its own fallback.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use helios_core::address::AccountAddress;
use helios_core::constants::{RESOURCE_TRANCHE_VAULT, RESOURCE_VAULT, RESOURCE_YIELD_STATE};
use helios_core::error::SourceError;
use helios_core::traits::{ChainClient, EventIndexClient, OffChainProvider};
use helios_core::types::{
    CompositionFragment, LedgerResource, OffChainFragment, OnChainFragment, SourceKind,
    TrancheState, VaultEvent, VaultId, VaultState,
};

use crate::fallback;

/// One data source feeding the snapshot.
#[async_trait]
pub trait SourceClient: Send + Sync {
    type Fragment: Send;

    fn kind(&self) -> SourceKind;

    async fn fetch(&self, vault_id: VaultId, owner: &str) -> Result<Self::Fragment, SourceError>;

    /// Deterministic substitute used when [`fetch`](Self::fetch) fails.
    fn fallback(&self, vault_id: VaultId, owner: &str) -> Self::Fragment;
}

fn parse_owner(owner: &str) -> Result<AccountAddress, SourceError> {
    owner
        .parse()
        .map_err(|e| SourceError::Malformed(format!("owner address {owner:?}: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(resource: &LedgerResource) -> Result<T, SourceError> {
    serde_json::from_value(resource.data.clone())
        .map_err(|e| SourceError::Malformed(format!("{}: {e}", resource.type_tag)))
}

/// Sort ledger resources into vault / tranche / yield sub-fragments.
///
/// Resource types other than the three known struct names are skipped.
pub fn classify_resources(resources: &[LedgerResource]) -> Result<OnChainFragment, SourceError> {
    let mut fragment = OnChainFragment::default();
    for resource in resources {
        match resource.struct_name() {
            RESOURCE_VAULT => fragment.vault = Some(decode::<VaultState>(resource)?),
            RESOURCE_TRANCHE_VAULT => fragment.tranches = Some(decode::<TrancheState>(resource)?),
            RESOURCE_YIELD_STATE => fragment.yield_state = Some(resource.data.clone()),
            other => debug!(resource = other, "ingest: ignoring unrecognized resource"),
        }
    }
    Ok(fragment)
}

// ---------------------------------------------------------------------------
// On-chain state
// ---------------------------------------------------------------------------

pub struct OnChainSource {
    chain: Arc<dyn ChainClient>,
}

impl OnChainSource {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl SourceClient for OnChainSource {
    type Fragment = OnChainFragment;

    fn kind(&self) -> SourceKind {
        SourceKind::OnChain
    }

    async fn fetch(&self, _vault_id: VaultId, owner: &str) -> Result<OnChainFragment, SourceError> {
        let owner = parse_owner(owner)?;
        let resources = self.chain.read_account_resources(&owner.to_hex()).await?;
        classify_resources(&resources)
    }

    fn fallback(&self, vault_id: VaultId, _owner: &str) -> OnChainFragment {
        fallback::on_chain(vault_id)
    }
}

// ---------------------------------------------------------------------------
// Event history
// ---------------------------------------------------------------------------

pub struct EventSource {
    index: Arc<dyn EventIndexClient>,
    limit: u32,
}

impl EventSource {
    pub fn new(index: Arc<dyn EventIndexClient>, limit: u32) -> Self {
        Self { index, limit }
    }
}

#[async_trait]
impl SourceClient for EventSource {
    type Fragment = Vec<VaultEvent>;

    fn kind(&self) -> SourceKind {
        SourceKind::Events
    }

    async fn fetch(&self, _vault_id: VaultId, owner: &str) -> Result<Vec<VaultEvent>, SourceError> {
        let owner = parse_owner(owner)?;
        let events = self.index.list_events(&owner.to_hex(), self.limit, 0).await?;
        Ok(events.into_iter().filter(VaultEvent::is_vault_related).collect())
    }

    fn fallback(&self, vault_id: VaultId, owner: &str) -> Vec<VaultEvent> {
        fallback::events(vault_id, owner)
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

pub struct CompositionSource {
    chain: Arc<dyn ChainClient>,
}

impl CompositionSource {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl SourceClient for CompositionSource {
    type Fragment = CompositionFragment;

    fn kind(&self) -> SourceKind {
        SourceKind::Composition
    }

    async fn fetch(&self, vault_id: VaultId, owner: &str) -> Result<CompositionFragment, SourceError> {
        let owner = parse_owner(owner)?;
        let resources = self.chain.read_account_resources(&owner.to_hex()).await?;
        let vault = resources
            .iter()
            .filter(|r| r.struct_name() == RESOURCE_VAULT)
            .filter_map(|r| match decode::<VaultState>(r) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!(vault_id, error = %e, "composition: skipping undecodable Vault resource");
                    None
                }
            })
            .find(|v| v.id == vault_id)
            .ok_or_else(|| SourceError::NotFound(format!("vault {vault_id} under {owner}")))?;

        Ok(CompositionFragment {
            total_value: vault.total_value,
            assets: vault.assets,
            created_ts: Some(vault.created_ts),
        })
    }

    fn fallback(&self, _vault_id: VaultId, _owner: &str) -> CompositionFragment {
        fallback::composition()
    }
}

// ---------------------------------------------------------------------------
// Off-chain credit data
// ---------------------------------------------------------------------------

pub struct OffChainSource {
    provider: Arc<dyn OffChainProvider>,
}

impl OffChainSource {
    pub fn new(provider: Arc<dyn OffChainProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SourceClient for OffChainSource {
    type Fragment = OffChainFragment;

    fn kind(&self) -> SourceKind {
        SourceKind::OffChain
    }

    async fn fetch(&self, vault_id: VaultId, _owner: &str) -> Result<OffChainFragment, SourceError> {
        self.provider.credit_profile(vault_id).await
    }

    fn fallback(&self, _vault_id: VaultId, _owner: &str) -> OffChainFragment {
        fallback::off_chain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_core::error::ChainError;
    use helios_core::types::{SignedPayload, TransactionReceipt};
    use serde_json::json;

    fn resource(type_tag: &str, data: serde_json::Value) -> LedgerResource {
        LedgerResource { type_tag: type_tag.into(), data }
    }

    #[test]
    fn classifies_known_resources() {
        let resources = vec![
            resource("0xabc::vault::Vault", json!({"id": "1", "total_value": "100"})),
            resource(
                "0xabc::tranche::TrancheVault",
                json!({"senior_supply": "60", "mezz_supply": "30", "junior_supply": "10"}),
            ),
            resource("0xabc::yield::YieldState", json!({"apy_bps": 450})),
            resource("0x1::account::Account", json!({"sequence_number": "0"})),
        ];
        let f = classify_resources(&resources).unwrap();
        assert_eq!(f.vault.unwrap().total_value, 100);
        assert_eq!(f.tranches.unwrap().total_supply(), 100);
        assert_eq!(f.yield_state.unwrap()["apy_bps"], 450);
    }

    #[test]
    fn tranche_vault_is_not_mistaken_for_vault() {
        let resources = vec![resource(
            "0xabc::tranche::TrancheVault",
            json!({"senior_supply": "1"}),
        )];
        let f = classify_resources(&resources).unwrap();
        assert!(f.vault.is_none());
        assert!(f.tranches.is_some());
    }

    #[test]
    fn unknown_resources_yield_empty_fragment() {
        let resources = vec![resource("0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>", json!({}))];
        assert_eq!(classify_resources(&resources).unwrap(), OnChainFragment::default());
    }

    #[test]
    fn malformed_vault_is_an_error() {
        let resources = vec![resource("0xabc::vault::Vault", json!({"id": "not-a-number"}))];
        assert!(matches!(classify_resources(&resources), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn owner_must_be_hex() {
        assert!(matches!(parse_owner(""), Err(SourceError::Malformed(_))));
        assert!(parse_owner("0xabc").is_ok());
    }

    struct Resources(Vec<LedgerResource>);

    #[async_trait]
    impl ChainClient for Resources {
        async fn read_account_resources(&self, _: &str) -> Result<Vec<LedgerResource>, ChainError> {
            Ok(self.0.clone())
        }

        async fn submit_transaction(&self, _: &SignedPayload) -> Result<String, ChainError> {
            Err(ChainError::Transport("read only".into()))
        }

        async fn await_confirmation(&self, _: &str) -> Result<TransactionReceipt, ChainError> {
            Err(ChainError::Transport("read only".into()))
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn composition_over(resources: Vec<LedgerResource>) -> CompositionSource {
        CompositionSource::new(Arc::new(Resources(resources)))
    }

    #[tokio::test]
    async fn composition_skips_undecodable_vault_entries() {
        let source = composition_over(vec![
            resource("0xabc::vault::Vault", json!({"id": "garbage"})),
            resource(
                "0xabc::vault::Vault",
                json!({"id": "2", "total_value": "40", "assets": [{"type": "invoice", "value": "40"}]}),
            ),
        ]);
        let c = source.fetch(2, "0xabc").await.unwrap();
        assert_eq!(c.total_value, 40);
        assert_eq!(c.assets.len(), 1);
    }

    #[tokio::test]
    async fn composition_without_matching_vault_is_not_found() {
        let source = composition_over(vec![
            resource("0xabc::vault::Vault", json!({"id": "garbage"})),
            resource("0xabc::vault::Vault", json!({"id": "3", "total_value": "1"})),
        ]);
        assert!(matches!(source.fetch(2, "0xabc").await, Err(SourceError::NotFound(_))));
    }
}
