//! Assessment pipeline: fetch, score, persist, publish.
//!
//! The score is persisted before publication is scheduled. Publication runs
//! as a detached task; its outcome is logged and never affects the caller.
//! Only a storage failure fails an assessment, and in that case nothing is
//! published.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use helios_core::error::StorageError;
use helios_core::traits::{ChainClient, EventIndexClient, Storage};
use helios_core::types::{PublicationResult, PublicationStatus, ScoreResult, ServiceStatus, VaultId};
use helios_ingest::Aggregator;
use helios_publisher::OraclePublisher;
use helios_scoring::ScoringEngine;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// A stored score younger than this is returned as-is by
    /// [`Pipeline::assess_unless_fresh`].
    pub reuse_window: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { reuse_window: Duration::from_secs(30) }
    }
}

pub struct Pipeline {
    aggregator: Aggregator,
    engine: ScoringEngine,
    storage: Arc<dyn Storage>,
    publisher: Arc<OraclePublisher>,
    chain: Arc<dyn ChainClient>,
    index: Arc<dyn EventIndexClient>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        aggregator: Aggregator,
        engine: ScoringEngine,
        storage: Arc<dyn Storage>,
        publisher: Arc<OraclePublisher>,
        chain: Arc<dyn ChainClient>,
        index: Arc<dyn EventIndexClient>,
        config: PipelineConfig,
    ) -> Self {
        Self { aggregator, engine, storage, publisher, chain, index, config }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn publisher(&self) -> &Arc<OraclePublisher> {
        &self.publisher
    }

    /// Assess a vault and schedule publication of the new score.
    pub async fn assess(&self, vault_id: VaultId, owner: &str) -> Result<ScoreResult, StorageError> {
        let (result, _publication) = self.assess_tracked(vault_id, owner).await?;
        Ok(result)
    }

    /// Like [`assess`](Self::assess), also returning the publication task.
    pub async fn assess_tracked(
        &self,
        vault_id: VaultId,
        owner: &str,
    ) -> Result<(ScoreResult, JoinHandle<PublicationResult>), StorageError> {
        let (snapshot, fell_back) = self.aggregator.fetch_detailed(vault_id, owner).await;
        if !fell_back.is_empty() {
            let sources: Vec<String> = fell_back.iter().map(ToString::to_string).collect();
            debug!(vault_id, fallbacks = ?sources, "pipeline: snapshot used fallback data");
        }

        let result = self.engine.score(&snapshot);
        self.storage.upsert_score(&result)?;
        info!(vault_id, score = result.score, tier = %result.risk_tier, "pipeline: vault assessed");

        let publisher = Arc::clone(&self.publisher);
        let owner = owner.to_string();
        let (score, factors) = (result.score, result.factors);
        let handle = tokio::spawn(async move {
            let outcome = publisher.publish(&owner, score, Some(factors)).await;
            if outcome.status == PublicationStatus::Error {
                warn!(
                    vault_id,
                    detail = outcome.error_detail.as_deref().unwrap_or_default(),
                    "pipeline: background publication failed"
                );
            }
            outcome
        });

        Ok((result, handle))
    }

    /// Return the stored score if it is younger than the reuse window,
    /// otherwise assess. `force` always assesses.
    pub async fn assess_unless_fresh(
        &self,
        vault_id: VaultId,
        owner: &str,
        force: bool,
    ) -> Result<ScoreResult, StorageError> {
        if !force {
            if let Some(stored) = self.storage.get_score(vault_id)? {
                let age = Utc::now().signed_duration_since(stored.computed_at);
                if age.to_std().is_ok_and(|age| age < self.config.reuse_window) {
                    debug!(vault_id, "pipeline: reusing fresh score");
                    return Ok(stored);
                }
            }
        }
        self.assess(vault_id, owner).await
    }

    /// Stored score, or the neutral default when the vault was never assessed.
    pub fn health(&self, vault_id: VaultId) -> Result<ScoreResult, StorageError> {
        Ok(self
            .storage
            .get_score(vault_id)?
            .unwrap_or_else(|| ScoreResult::neutral(vault_id, Utc::now(), None)))
    }

    pub async fn status(&self) -> ServiceStatus {
        let (chain_reachable, index_reachable) =
            tokio::join!(self.chain.health_check(), self.index.health_check());
        ServiceStatus {
            capability_state: self.publisher.state(),
            chain_reachable,
            index_reachable,
        }
    }
}
