//! Shared collaborators and fixtures for integration tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;

use helios_agent_lib::{MemoryScoreStore, Pipeline, PipelineConfig};
use helios_core::error::{ChainError, IndexError, SourceError, StorageError};
use helios_core::traits::{ChainClient, EventIndexClient, OffChainProvider, Storage};
use helios_core::types::*;
use helios_ingest::{Aggregator, AggregatorConfig, SimulatedCreditProvider};
use helios_publisher::{OraclePublisher, PublisherConfig};
use helios_scoring::ScoringEngine;

/// A valid Ed25519 private key for live-mode tests.
pub const TEST_KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

/// A well-formed vault owner address.
pub const OWNER: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

// ---------------------------------------------------------------------------
// Chain client
// ---------------------------------------------------------------------------

/// Ledger double that counts every call.
#[derive(Default)]
pub struct MockChainClient {
    pub healthy: bool,
    /// Returned by `read_account_resources`; `None` means the node is down.
    pub resources: Option<Vec<LedgerResource>>,
    /// 1-based submission number to reject.
    pub fail_on_submit: Option<usize>,
    pub reads: AtomicUsize,
    pub submits: AtomicUsize,
    pub confirms: AtomicUsize,
    pub health_checks: AtomicUsize,
    pub submitted: Mutex<Vec<SignedPayload>>,
}

impl MockChainClient {
    /// Reachable node holding `resources` under every account.
    pub fn healthy(resources: Vec<LedgerResource>) -> Self {
        Self { healthy: true, resources: Some(resources), ..Default::default() }
    }

    /// Node that refuses every request.
    pub fn down() -> Self {
        Self::default()
    }

    pub fn failing_submit(mut self, n: usize) -> Self {
        self.fail_on_submit = Some(n);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
            + self.submits.load(Ordering::SeqCst)
            + self.confirms.load(Ordering::SeqCst)
            + self.health_checks.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn read_account_resources(&self, _address: &str) -> Result<Vec<LedgerResource>, ChainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.resources
            .clone()
            .ok_or_else(|| ChainError::Transport("connection refused".into()))
    }

    async fn submit_transaction(&self, payload: &SignedPayload) -> Result<String, ChainError> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted.lock().push(payload.clone());
        if self.fail_on_submit == Some(n) {
            return Err(ChainError::Status { status: 500, body: "mempool full".into() });
        }
        Ok(format!("0x{n:064x}"))
    }

    async fn await_confirmation(&self, tx_ref: &str) -> Result<TransactionReceipt, ChainError> {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionReceipt { tx_ref: tx_ref.to_string(), gas_used: 9, version: None })
    }

    async fn health_check(&self) -> bool {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        self.healthy
    }
}

// ---------------------------------------------------------------------------
// Event index
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockIndex {
    /// `None` means the indexer is down.
    pub events: Option<Vec<VaultEvent>>,
    pub calls: AtomicUsize,
}

impl MockIndex {
    pub fn with_events(events: Vec<VaultEvent>) -> Self {
        Self { events: Some(events), ..Default::default() }
    }

    pub fn down() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventIndexClient for MockIndex {
    async fn list_events(&self, _address: &str, limit: u32, _offset: u32) -> Result<Vec<VaultEvent>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.events {
            Some(events) => Ok(events.iter().take(limit as usize).cloned().collect()),
            None => Err(IndexError::Status { status: 503 }),
        }
    }

    async fn health_check(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.events.is_some()
    }
}

// ---------------------------------------------------------------------------
// Off-chain provider and storage
// ---------------------------------------------------------------------------

pub struct FailingOffChain;

#[async_trait]
impl OffChainProvider for FailingOffChain {
    async fn credit_profile(&self, _vault_id: VaultId) -> Result<OffChainFragment, SourceError> {
        Err(SourceError::Unavailable("bureau offline".into()))
    }
}

/// Returns a fixed fragment, for driving the scoring engine end to end.
pub struct FixedOffChain(pub OffChainFragment);

#[async_trait]
impl OffChainProvider for FixedOffChain {
    async fn credit_profile(&self, _vault_id: VaultId) -> Result<OffChainFragment, SourceError> {
        Ok(self.0.clone())
    }
}

/// Storage whose writes always fail.
pub struct FailingStorage;

impl Storage for FailingStorage {
    fn upsert_score(&self, _result: &ScoreResult) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk full".into()))
    }

    fn get_score(&self, _vault_id: VaultId) -> Result<Option<ScoreResult>, StorageError> {
        Ok(None)
    }

    fn list_scored_vault_ids(&self) -> Result<BTreeSet<VaultId>, StorageError> {
        Ok(BTreeSet::new())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn asset(id: u64, asset_type: &str, value: u64) -> Asset {
    Asset {
        id: Some(id),
        asset_type: asset_type.to_string(),
        value,
        originator: None,
        risk_rating: None,
    }
}

/// A `Vault` ledger resource.
pub fn vault_resource(vault_id: VaultId, assets: &[Asset]) -> LedgerResource {
    let total: u64 = assets.iter().map(|a| a.value).sum();
    LedgerResource {
        type_tag: "0xcafe::vault::Vault".to_string(),
        data: json!({
            "id": vault_id.to_string(),
            "total_value": total.to_string(),
            "created_ts": "1700000000",
            "assets": assets,
        }),
    }
}

pub fn off_chain(ltv: f64, reputation: Option<f64>, rates: RateEnvironment, defaults: DefaultTrend) -> OffChainFragment {
    OffChainFragment {
        average_credit_score: 700.0,
        weighted_ltv_ratio: ltv,
        payment_history_score: 90.0,
        originator_reputation: reputation,
        market_conditions: MarketConditions {
            interest_rate_environment: rates,
            default_rate_trend: defaults,
            credit_spread_index: None,
        },
        external_ratings: None,
    }
}

pub fn snapshot(vault_id: VaultId, composition: CompositionFragment, off_chain: OffChainFragment) -> VaultSnapshot {
    VaultSnapshot {
        vault_id,
        owner_address: OWNER.to_string(),
        on_chain: OnChainFragment::default(),
        events: Vec::new(),
        composition,
        off_chain,
        captured_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

/// Two asset types, LTV 65, reputation 80, rising rates: factors
/// 70 / 85 / 80 / 60.
pub fn worked_example() -> VaultSnapshot {
    let assets = vec![asset(1, "invoice_financing", 2_000_000), asset(2, "real_estate_bridge", 3_000_000)];
    snapshot(
        1,
        CompositionFragment { total_value: 5_000_000, assets, created_ts: None },
        off_chain(65.0, Some(80.0), RateEnvironment::Rising, DefaultTrend::Stable),
    )
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub struct Harness {
    pub chain: Arc<MockChainClient>,
    pub index: Arc<MockIndex>,
    pub storage: Arc<dyn Storage>,
    pub pipeline: Pipeline,
}

pub struct HarnessBuilder {
    chain: MockChainClient,
    index: MockIndex,
    provider: Arc<dyn OffChainProvider>,
    storage: Arc<dyn Storage>,
    private_key: Option<&'static str>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            chain: MockChainClient::down(),
            index: MockIndex::down(),
            provider: Arc::new(SimulatedCreditProvider::new(Duration::ZERO)),
            storage: Arc::new(MemoryScoreStore::new()),
            private_key: None,
        }
    }
}

impl HarnessBuilder {
    pub fn chain(mut self, chain: MockChainClient) -> Self {
        self.chain = chain;
        self
    }

    pub fn index(mut self, index: MockIndex) -> Self {
        self.index = index;
        self
    }

    pub fn provider(mut self, provider: impl OffChainProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Arc::new(storage);
        self
    }

    pub fn live(mut self) -> Self {
        self.private_key = Some(TEST_KEY);
        self
    }

    /// Build the pipeline. Capability detection runs here, so a keyless
    /// harness never touches the chain during construction.
    pub async fn build(self) -> Harness {
        let chain = Arc::new(self.chain);
        let index = Arc::new(self.index);
        let publisher_config = PublisherConfig {
            module_address: "0xcafe".to_string(),
            batch_delay: Duration::from_millis(500),
        };
        let publisher = OraclePublisher::detect(
            publisher_config,
            self.private_key,
            Some(Arc::clone(&chain) as Arc<dyn ChainClient>),
        )
        .await;
        let aggregator = Aggregator::new(
            Arc::clone(&chain) as Arc<dyn ChainClient>,
            Arc::clone(&index) as Arc<dyn EventIndexClient>,
            self.provider,
            AggregatorConfig { source_timeout: Duration::from_secs(1), ..AggregatorConfig::default() },
        );
        let pipeline = Pipeline::new(
            aggregator,
            ScoringEngine::new(),
            Arc::clone(&self.storage),
            Arc::new(publisher),
            Arc::clone(&chain) as Arc<dyn ChainClient>,
            Arc::clone(&index) as Arc<dyn EventIndexClient>,
            PipelineConfig::default(),
        );
        Harness { chain, index, storage: self.storage, pipeline }
    }
}
