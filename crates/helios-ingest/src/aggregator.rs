//! Concurrent snapshot assembly with per-source isolation.
//!
//! Every source runs under its own timeout. A failure in one source never
//! affects the others: its fragment is replaced by the source's fallback and
//! the substitution is logged.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use helios_core::constants::{DEFAULT_EVENT_LIMIT, DEFAULT_SOURCE_TIMEOUT};
use helios_core::error::SourceError;
use helios_core::traits::{ChainClient, EventIndexClient, OffChainProvider};
use helios_core::types::{SourceKind, VaultId, VaultSnapshot};

use crate::sources::{CompositionSource, EventSource, OffChainSource, OnChainSource, SourceClient};

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Upper bound on a single source fetch.
    pub source_timeout: Duration,
    /// Page size requested from the event indexer.
    pub event_limit: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            event_limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

/// Builds a [`VaultSnapshot`] from the four sources.
pub struct Aggregator {
    on_chain: OnChainSource,
    events: EventSource,
    composition: CompositionSource,
    off_chain: OffChainSource,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        index: Arc<dyn EventIndexClient>,
        provider: Arc<dyn OffChainProvider>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            on_chain: OnChainSource::new(Arc::clone(&chain)),
            events: EventSource::new(index, config.event_limit),
            composition: CompositionSource::new(chain),
            off_chain: OffChainSource::new(provider),
            config,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fetch a complete snapshot. Never fails.
    pub async fn fetch(&self, vault_id: VaultId, owner: &str) -> VaultSnapshot {
        self.fetch_detailed(vault_id, owner).await.0
    }

    /// Fetch a snapshot and report which sources were replaced by fallbacks.
    pub async fn fetch_detailed(
        &self,
        vault_id: VaultId,
        owner: &str,
    ) -> (VaultSnapshot, Vec<SourceKind>) {
        let timeout = self.config.source_timeout;
        let (on_chain, events, composition, off_chain) = tokio::join!(
            fetch_isolated(&self.on_chain, vault_id, owner, timeout),
            fetch_isolated(&self.events, vault_id, owner, timeout),
            fetch_isolated(&self.composition, vault_id, owner, timeout),
            fetch_isolated(&self.off_chain, vault_id, owner, timeout),
        );

        let fell_back: Vec<SourceKind> = [
            (SourceKind::OnChain, on_chain.1),
            (SourceKind::Events, events.1),
            (SourceKind::Composition, composition.1),
            (SourceKind::OffChain, off_chain.1),
        ]
        .into_iter()
        .filter_map(|(kind, substituted)| substituted.then_some(kind))
        .collect();

        debug!(vault_id, fallbacks = fell_back.len(), "ingest: snapshot assembled");

        let snapshot = VaultSnapshot {
            vault_id,
            owner_address: owner.to_string(),
            on_chain: on_chain.0,
            events: events.0,
            composition: composition.0,
            off_chain: off_chain.0,
            captured_at: Utc::now(),
        };
        (snapshot, fell_back)
    }
}

/// Run one source under `timeout`. Returns the fragment and whether it is
/// the fallback.
pub async fn fetch_isolated<S: SourceClient>(
    source: &S,
    vault_id: VaultId,
    owner: &str,
    timeout: Duration,
) -> (S::Fragment, bool) {
    let result = match tokio::time::timeout(timeout, source.fetch(vault_id, owner)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(timeout.as_millis() as u64)),
    };
    match result {
        Ok(fragment) => (fragment, false),
        Err(e) => {
            warn!(
                vault_id,
                source = %source.kind(),
                error = %e,
                "ingest: source failed, using fallback"
            );
            (source.fallback(vault_id, owner), true)
        }
    }
}
