//! Capability-gated score publisher.
//!
//! The capability is resolved once by [`OraclePublisher::detect`]:
//!
//! | signing key | chain client healthy | state      |
//! |-------------|----------------------|------------|
//! | missing     | not probed           | DEGRADED   |
//! | invalid     | not probed           | DEGRADED   |
//! | valid       | no                   | DEGRADED   |
//! | valid       | yes                  | LIVE       |
//!
//! A DEGRADED publisher never touches the network and reports every
//! publication as `simulated`. A LIVE publisher reports failures as `error`
//! and never falls back to simulation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use helios_core::address::AccountAddress;
use helios_core::constants::{DEFAULT_BATCH_DELAY, DEFAULT_MODULE_ADDRESS, TX_EXPIRATION_SECS};
use helios_core::error::PublishError;
use helios_core::traits::ChainClient;
use helios_core::types::{
    CapabilityState, PublicationResult, PublishRequest, RiskFactors, TransactionReceipt, VaultId,
};

use crate::payload::{self, EntryFunction, RawTransaction};
use crate::signer::OracleSigner;

/// Message attached to every simulated publication.
pub const SIMULATED_MESSAGE: &str = "Running in mock mode - no actual transaction submitted";

/// Struct name of the framework resource carrying the account sequence number.
const ACCOUNT_RESOURCE: &str = "Account";

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Address the `risk_oracle` module is published under.
    pub module_address: String,
    /// Pause between consecutive submissions in a batch.
    pub batch_delay: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            module_address: DEFAULT_MODULE_ADDRESS.to_string(),
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

enum Mode {
    Live {
        signer: OracleSigner,
        chain: Arc<dyn ChainClient>,
        module: AccountAddress,
        /// Held from the sequence-number read until confirmation, so
        /// concurrent publications never sign with the same number.
        submit_lock: Mutex<()>,
    },
    Degraded {
        reason: String,
    },
}

pub struct OraclePublisher {
    mode: Mode,
    batch_delay: Duration,
}

impl OraclePublisher {
    /// Resolve the capability state.
    ///
    /// The chain client is probed only when a valid key is present, so a
    /// keyless publisher makes no network calls at all.
    pub async fn detect(
        config: PublisherConfig,
        private_key: Option<&str>,
        chain: Option<Arc<dyn ChainClient>>,
    ) -> Self {
        let batch_delay = config.batch_delay;
        let key = match private_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                warn!("publisher: no private key provided, running in mock mode");
                return Self::degraded(config, "no signing key configured");
            }
        };
        let signer = match OracleSigner::from_hex(key) {
            Ok(signer) => signer,
            Err(e) => {
                error!(error = %e, "publisher: failed to load private key, running in mock mode");
                return Self::degraded(config, format!("signing key rejected: {e}"));
            }
        };
        let module = match AccountAddress::from_hex(&config.module_address) {
            Ok(module) => module,
            Err(e) => {
                error!(module = %config.module_address, error = %e, "publisher: invalid module address");
                return Self::degraded(config, format!("invalid module address: {e}"));
            }
        };
        let Some(chain) = chain else {
            warn!("publisher: no chain client, running in mock mode");
            return Self::degraded(config, "no chain client configured");
        };
        if !chain.health_check().await {
            warn!("publisher: ledger unreachable at startup, running in mock mode");
            return Self::degraded(config, "ledger unreachable at startup");
        }

        info!(address = %signer.address(), "publisher: live, publishing as oracle updater");
        Self {
            mode: Mode::Live { signer, chain, module, submit_lock: Mutex::new(()) },
            batch_delay,
        }
    }

    /// A publisher that only simulates.
    pub fn degraded(config: PublisherConfig, reason: impl Into<String>) -> Self {
        Self {
            mode: Mode::Degraded { reason: reason.into() },
            batch_delay: config.batch_delay,
        }
    }

    pub fn state(&self) -> CapabilityState {
        match self.mode {
            Mode::Live { .. } => CapabilityState::Live,
            Mode::Degraded { .. } => CapabilityState::Degraded,
        }
    }

    /// Why the publisher is degraded, if it is.
    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.mode {
            Mode::Live { .. } => None,
            Mode::Degraded { reason } => Some(reason),
        }
    }

    /// The updater address, when live.
    pub fn address(&self) -> Option<AccountAddress> {
        match &self.mode {
            Mode::Live { signer, .. } => Some(signer.address()),
            Mode::Degraded { .. } => None,
        }
    }

    pub async fn publish(
        &self,
        vault_owner: &str,
        score: u8,
        risk_factors: Option<RiskFactors>,
    ) -> PublicationResult {
        let req = PublishRequest {
            vault_owner: vault_owner.to_string(),
            score,
            risk_factors,
        };
        self.publish_request(&req).await
    }

    pub async fn publish_request(&self, req: &PublishRequest) -> PublicationResult {
        let Mode::Live { signer, chain, module, submit_lock } = &self.mode else {
            warn!(vault_owner = %req.vault_owner, score = req.score, "publisher: simulating publication");
            return PublicationResult::simulated(req, SIMULATED_MESSAGE);
        };

        let outcome = {
            let _guard = submit_lock.lock().await;
            publish_score(signer, chain.as_ref(), *module, req).await
        };
        match outcome {
            Ok(receipt) => {
                info!(
                    vault_owner = %req.vault_owner,
                    score = req.score,
                    tx_ref = %receipt.tx_ref,
                    gas_used = receipt.gas_used,
                    "publisher: health score published"
                );
                PublicationResult::success(req, receipt.tx_ref, receipt.gas_used)
            }
            Err(e) => {
                error!(vault_owner = %req.vault_owner, error = %e, "publisher: publication failed");
                PublicationResult::error(req, format!("On-chain publication failed: {e}"))
            }
        }
    }

    /// Publish sequentially. One result per request, in order; a failed item
    /// never stops the rest. Live submissions are spaced by the batch delay.
    pub async fn publish_batch(&self, requests: &[PublishRequest]) -> Vec<PublicationResult> {
        let live = self.state() == CapabilityState::Live;
        let mut results = Vec::with_capacity(requests.len());
        for (i, req) in requests.iter().enumerate() {
            if live && i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            results.push(self.publish_request(req).await);
        }
        results
    }

    /// Register the agent as authorized updater for `vault_id`.
    ///
    /// The returned result's `vault_owner` is the updater address when live
    /// and empty when simulated.
    pub async fn initialize_vault(&self, vault_id: VaultId, initial_score: u8) -> PublicationResult {
        let Mode::Live { signer, chain, module, submit_lock } = &self.mode else {
            let req = PublishRequest { vault_owner: String::new(), score: initial_score, risk_factors: None };
            return PublicationResult::simulated(&req, format!("{SIMULATED_MESSAGE} (vault {vault_id} init)"));
        };

        let updater = signer.address();
        let req = PublishRequest {
            vault_owner: updater.to_hex(),
            score: initial_score,
            risk_factors: None,
        };
        let entry = payload::init(*module, vault_id, initial_score, updater);
        let outcome = {
            let _guard = submit_lock.lock().await;
            submit(signer, chain.as_ref(), entry).await
        };
        match outcome {
            Ok(receipt) => {
                info!(vault_id, tx_ref = %receipt.tx_ref, "publisher: vault oracle initialized");
                let mut result = PublicationResult::success(&req, receipt.tx_ref, receipt.gas_used);
                result.message = Some(format!("vault {vault_id} oracle initialized"));
                result
            }
            Err(e) => {
                error!(vault_id, error = %e, "publisher: vault oracle init failed");
                PublicationResult::error(&req, format!("Oracle initialization failed: {e}"))
            }
        }
    }
}

async fn publish_score(
    signer: &OracleSigner,
    chain: &dyn ChainClient,
    module: AccountAddress,
    req: &PublishRequest,
) -> Result<TransactionReceipt, PublishError> {
    let owner = AccountAddress::from_hex(&req.vault_owner)?;
    let entry = match &req.risk_factors {
        Some(f) => payload::update_health_score_with_factors(module, owner, req.score, f),
        None => payload::update_health_score(module, owner, req.score),
    };
    submit(signer, chain, entry).await
}

/// Sign, submit, and wait for one entry-function call.
async fn submit(
    signer: &OracleSigner,
    chain: &dyn ChainClient,
    entry: EntryFunction,
) -> Result<TransactionReceipt, PublishError> {
    let sender = signer.address();
    let sequence_number = sequence_number(chain, sender).await?;
    let raw = RawTransaction {
        sender,
        sequence_number,
        payload: entry,
        expiration_timestamp_secs: Utc::now().timestamp().max(0) as u64 + TX_EXPIRATION_SECS,
    };
    let signed = signer.sign_transaction(&raw)?;
    let tx_ref = chain.submit_transaction(&signed).await.map_err(PublishError::Submit)?;
    chain.await_confirmation(&tx_ref).await.map_err(PublishError::Confirm)
}

/// Next sequence number for `address`. An account without the framework
/// resource has not sent anything yet.
async fn sequence_number(chain: &dyn ChainClient, address: AccountAddress) -> Result<u64, PublishError> {
    let resources = chain
        .read_account_resources(&address.to_hex())
        .await
        .map_err(PublishError::Account)?;
    let seq = resources
        .iter()
        .find(|r| r.struct_name() == ACCOUNT_RESOURCE)
        .and_then(|r| match &r.data["sequence_number"] {
            serde_json::Value::String(s) => s.parse().ok(),
            v => v.as_u64(),
        })
        .unwrap_or(0);
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use helios_core::error::ChainError;
    use helios_core::types::{LedgerResource, PublicationStatus, SignedPayload};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::signer::verify_payload;

    const KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";
    const OWNER: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

    #[derive(Default)]
    struct RecordingChain {
        healthy: bool,
        /// 1-based submission index that is rejected.
        fail_on_submit: Option<usize>,
        calls: AtomicUsize,
        submitted: Mutex<Vec<SignedPayload>>,
    }

    #[async_trait]
    impl ChainClient for RecordingChain {
        async fn read_account_resources(&self, _: &str) -> Result<Vec<LedgerResource>, ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![LedgerResource {
                type_tag: "0x1::account::Account".into(),
                data: json!({"sequence_number": "5"}),
            }])
        }

        async fn submit_transaction(&self, payload: &SignedPayload) -> Result<String, ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut submitted = self.submitted.lock();
            submitted.push(payload.clone());
            if self.fail_on_submit == Some(submitted.len()) {
                return Err(ChainError::Status { status: 400, body: "SEQUENCE_NUMBER_TOO_OLD".into() });
            }
            Ok(format!("0x{:02x}", submitted.len()))
        }

        async fn await_confirmation(&self, tx_ref: &str) -> Result<TransactionReceipt, ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TransactionReceipt { tx_ref: tx_ref.to_string(), gas_used: 11, version: Some(1) })
        }

        async fn health_check(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.healthy
        }
    }

    fn healthy() -> Arc<RecordingChain> {
        Arc::new(RecordingChain { healthy: true, ..Default::default() })
    }

    fn config() -> PublisherConfig {
        PublisherConfig { module_address: "0xcafe".into(), batch_delay: Duration::from_millis(500) }
    }

    fn request(score: u8) -> PublishRequest {
        PublishRequest { vault_owner: OWNER.into(), score, risk_factors: None }
    }

    #[tokio::test]
    async fn no_key_is_degraded_without_probing() {
        let chain = healthy();
        let p = OraclePublisher::detect(config(), None, Some(chain.clone())).await;
        assert_eq!(p.state(), CapabilityState::Degraded);

        let r = p.publish(OWNER, 70, None).await;
        assert_eq!(r.status, PublicationStatus::Simulated);
        assert_eq!(r.message.as_deref(), Some(SIMULATED_MESSAGE));
        assert_eq!(chain.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_key_is_degraded() {
        let chain = healthy();
        let p = OraclePublisher::detect(config(), Some("not-hex"), Some(chain.clone())).await;
        assert_eq!(p.state(), CapabilityState::Degraded);
        assert!(p.degraded_reason().unwrap().contains("signing key rejected"));
        assert_eq!(chain.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_chain_is_degraded() {
        let chain = Arc::new(RecordingChain::default());
        let p = OraclePublisher::detect(config(), Some(KEY), Some(chain)).await;
        assert_eq!(p.state(), CapabilityState::Degraded);
        assert_eq!(p.degraded_reason(), Some("ledger unreachable at startup"));
    }

    #[tokio::test]
    async fn live_publish_submits_signed_transaction() {
        let chain = healthy();
        let p = OraclePublisher::detect(config(), Some(KEY), Some(chain.clone())).await;
        assert_eq!(p.state(), CapabilityState::Live);

        let factors = RiskFactors::neutral();
        let r = p.publish(OWNER, 61, Some(factors)).await;
        assert_eq!(r.status, PublicationStatus::Success);
        assert_eq!(r.transaction_ref.as_deref(), Some("0x01"));
        assert_eq!(r.gas_used, Some(11));
        assert_eq!(r.risk_factors, Some(factors));

        let submitted = chain.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert!(verify_payload(&submitted[0]));
        assert_eq!(Some(submitted[0].sender), p.address());
    }

    #[tokio::test]
    async fn live_failure_is_error_not_simulated() {
        let chain = Arc::new(RecordingChain { healthy: true, fail_on_submit: Some(1), ..Default::default() });
        let p = OraclePublisher::detect(config(), Some(KEY), Some(chain)).await;
        let r = p.publish(OWNER, 61, None).await;
        assert_eq!(r.status, PublicationStatus::Error);
        assert!(r.error_detail.unwrap().contains("SEQUENCE_NUMBER_TOO_OLD"));
    }

    #[tokio::test]
    async fn bad_owner_is_error_in_live_mode() {
        let p = OraclePublisher::detect(config(), Some(KEY), Some(healthy())).await;
        let r = p.publish("vault-owner", 61, None).await;
        assert_eq!(r.status, PublicationStatus::Error);
        assert!(r.error_detail.unwrap().contains("invalid vault owner"));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_records_each_item_and_spaces_submissions() {
        let chain = Arc::new(RecordingChain { healthy: true, fail_on_submit: Some(2), ..Default::default() });
        let p = OraclePublisher::detect(config(), Some(KEY), Some(chain)).await;

        let start = tokio::time::Instant::now();
        let results = p.publish_batch(&[request(10), request(20), request(30)]).await;
        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![PublicationStatus::Success, PublicationStatus::Error, PublicationStatus::Success]
        );
        assert_eq!(results[1].score, 20);
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_batch_has_no_delay() {
        let p = OraclePublisher::degraded(config(), "test");
        let start = tokio::time::Instant::now();
        let results = p.publish_batch(&[request(10), request(20)]).await;
        assert!(results.iter().all(|r| r.status == PublicationStatus::Simulated));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn initialize_vault_names_agent_as_updater() {
        let chain = healthy();
        let p = OraclePublisher::detect(config(), Some(KEY), Some(chain.clone())).await;
        let r = p.initialize_vault(4, 50).await;
        assert_eq!(r.status, PublicationStatus::Success);
        assert_eq!(r.vault_owner, p.address().unwrap().to_hex());

        let raw = hex::decode(&chain.submitted.lock()[0].raw_txn).unwrap();
        let (txn, _): (RawTransaction, usize) =
            bincode::decode_from_slice(&raw, bincode::config::standard()).unwrap();
        assert_eq!(txn.sequence_number, 5);
        assert_eq!(txn.payload.function, "init");
    }

    #[tokio::test]
    async fn degraded_initialize_is_simulated() {
        let p = OraclePublisher::degraded(config(), "test");
        let r = p.initialize_vault(4, 50).await;
        assert_eq!(r.status, PublicationStatus::Simulated);
        assert!(r.message.unwrap().contains("vault 4"));
    }

    /// Ledger double that accepts a transaction only at the account's
    /// current sequence number and bumps it on commit.
    #[derive(Default)]
    struct SequencedChain {
        next_seq: Mutex<u64>,
        rejected: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl ChainClient for SequencedChain {
        async fn read_account_resources(&self, _: &str) -> Result<Vec<LedgerResource>, ChainError> {
            let seq = *self.next_seq.lock();
            // Let a concurrent caller read the same value.
            tokio::task::yield_now().await;
            Ok(vec![LedgerResource {
                type_tag: "0x1::account::Account".into(),
                data: json!({"sequence_number": seq.to_string()}),
            }])
        }

        async fn submit_transaction(&self, payload: &SignedPayload) -> Result<String, ChainError> {
            let raw = hex::decode(&payload.raw_txn).map_err(|e| ChainError::Decode(e.to_string()))?;
            let (txn, _): (RawTransaction, usize) =
                bincode::decode_from_slice(&raw, bincode::config::standard())
                    .map_err(|e| ChainError::Decode(e.to_string()))?;
            let mut next = self.next_seq.lock();
            if txn.sequence_number != *next {
                self.rejected.lock().push(txn.sequence_number);
                return Err(ChainError::Status { status: 400, body: "SEQUENCE_NUMBER_TOO_OLD".into() });
            }
            *next += 1;
            Ok(format!("0x{:02x}", *next))
        }

        async fn await_confirmation(&self, tx_ref: &str) -> Result<TransactionReceipt, ChainError> {
            tokio::task::yield_now().await;
            Ok(TransactionReceipt { tx_ref: tx_ref.to_string(), gas_used: 7, version: None })
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn concurrent_publications_use_distinct_sequence_numbers() {
        let chain = Arc::new(SequencedChain::default());
        let p = OraclePublisher::detect(config(), Some(KEY), Some(chain.clone())).await;
        assert_eq!(p.state(), CapabilityState::Live);

        let (a, b, c) = tokio::join!(
            p.publish(OWNER, 60, None),
            p.publish(OWNER, 70, None),
            p.initialize_vault(3, 50),
        );

        assert_eq!(a.status, PublicationStatus::Success);
        assert_eq!(b.status, PublicationStatus::Success);
        assert_eq!(c.status, PublicationStatus::Success);
        assert!(chain.rejected.lock().is_empty());
        assert_eq!(*chain.next_seq.lock(), 3);
    }
}
