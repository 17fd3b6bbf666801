//! Collaborator interfaces consumed by the oracle core.
//!
//! - [`ChainClient`] — ledger reads, transaction submission (helios-ledger implements)
//! - [`EventIndexClient`] — indexed event history (helios-ledger implements)
//! - [`OffChainProvider`] — credit bureau data (helios-ingest ships a simulator)
//! - [`Storage`] — the persisted score table (helios-agent implements)

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::{ChainError, IndexError, SourceError, StorageError};
use crate::types::{
    LedgerResource, OffChainFragment, ScoreResult, ScoreStats, SignedPayload, TransactionReceipt,
    VaultEvent, VaultId,
};

/// Access to the ledger node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// All resources stored under `address`.
    async fn read_account_resources(&self, address: &str) -> Result<Vec<LedgerResource>, ChainError>;

    /// Submit a signed transaction. Returns the transaction reference (hash).
    async fn submit_transaction(&self, payload: &SignedPayload) -> Result<String, ChainError>;

    /// Wait until `tx_ref` is committed. A committed-but-failed transaction
    /// is reported as [`ChainError::Rejected`].
    async fn await_confirmation(&self, tx_ref: &str) -> Result<TransactionReceipt, ChainError>;

    /// Whether the node currently answers. Never errors.
    async fn health_check(&self) -> bool;
}

/// Access to the event indexer.
#[async_trait]
pub trait EventIndexClient: Send + Sync {
    /// Events emitted by `address`, oldest first.
    async fn list_events(
        &self,
        address: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<VaultEvent>, IndexError>;

    /// Whether the indexer currently answers. Never errors.
    async fn health_check(&self) -> bool;
}

/// Off-chain credit data for a vault's borrowers.
#[async_trait]
pub trait OffChainProvider: Send + Sync {
    async fn credit_profile(&self, vault_id: VaultId) -> Result<OffChainFragment, SourceError>;
}

/// The persisted score table: one row per vault, last writer wins.
pub trait Storage: Send + Sync {
    /// Insert or replace the score for `result.vault_id`.
    fn upsert_score(&self, result: &ScoreResult) -> Result<(), StorageError>;

    fn get_score(&self, vault_id: VaultId) -> Result<Option<ScoreResult>, StorageError>;

    fn list_scored_vault_ids(&self) -> Result<BTreeSet<VaultId>, StorageError>;

    /// Row count, mean score, and newest timestamp.
    ///
    /// Default implementation folds over every stored row.
    fn aggregate_stats(&self) -> Result<ScoreStats, StorageError> {
        let mut stats = ScoreStats::default();
        let mut total: u64 = 0;
        for vault_id in self.list_scored_vault_ids()? {
            if let Some(result) = self.get_score(vault_id)? {
                stats.count += 1;
                total += u64::from(result.score);
                stats.max_timestamp = match stats.max_timestamp {
                    Some(ts) if ts >= result.computed_at => Some(ts),
                    _ => Some(result.computed_at),
                };
            }
        }
        if stats.count > 0 {
            stats.average = Some(total as f64 / stats.count as f64);
        }
        Ok(stats)
    }
}
