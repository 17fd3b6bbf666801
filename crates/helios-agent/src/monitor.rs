//! Periodic re-assessment of watched vaults.
//!
//! Each watched vault gets its own task. A successful assessment waits the
//! regular interval; consecutive failures wait an exponentially growing
//! backoff (with jitter) capped at `max_backoff`. All tasks stop when the
//! monitor's [`CancellationToken`] is cancelled.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use helios_core::types::VaultId;

use crate::pipeline::Pipeline;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Fraction of the backoff added as random jitter, in `[0, 1]`.
    pub jitter_factor: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(15 * 60),
            jitter_factor: 0.2,
        }
    }
}

/// A vault to keep assessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedVault {
    pub vault_id: VaultId,
    pub owner: String,
}

impl FromStr for WatchedVault {
    type Err = String;

    /// Parses `id:owner`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, owner) = s
            .split_once(':')
            .ok_or_else(|| format!("expected id:owner, got {s:?}"))?;
        let vault_id = id.trim().parse().map_err(|e| format!("invalid vault id {id:?}: {e}"))?;
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(format!("missing owner for vault {vault_id}"));
        }
        Ok(Self { vault_id, owner: owner.to_string() })
    }
}

/// Delay before retry number `failures` (1-based), without jitter.
pub fn next_backoff(failures: u32, config: &MonitorConfig) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    config
        .initial_backoff
        .saturating_mul(2u32.saturating_pow(exp))
        .min(config.max_backoff)
}

/// [`next_backoff`] plus up to `jitter_factor` of itself, still capped at `max_backoff`.
pub fn backoff_with_jitter(failures: u32, config: &MonitorConfig) -> Duration {
    let delay = next_backoff(failures, config);
    let factor = config.jitter_factor.clamp(0.0, 1.0);
    let jitter_ms = (delay.as_millis() as f64 * factor * rand::thread_rng().gen_range(0.0_f64..1.0)) as u64;
    (delay + Duration::from_millis(jitter_ms)).min(config.max_backoff)
}

pub struct VaultMonitor {
    pipeline: Arc<Pipeline>,
    config: MonitorConfig,
    cancel: CancellationToken,
}

impl VaultMonitor {
    pub fn new(pipeline: Arc<Pipeline>, config: MonitorConfig) -> Self {
        Self { pipeline, config, cancel: CancellationToken::new() }
    }

    /// Token that stops every watch task when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Start one watch task per vault.
    pub fn spawn(&self, vaults: Vec<WatchedVault>) -> Vec<JoinHandle<()>> {
        vaults
            .into_iter()
            .map(|vault| {
                let pipeline = Arc::clone(&self.pipeline);
                let config = self.config.clone();
                let cancel = self.cancel.child_token();
                tokio::spawn(watch(pipeline, vault, config, cancel))
            })
            .collect()
    }
}

async fn watch(pipeline: Arc<Pipeline>, vault: WatchedVault, config: MonitorConfig, cancel: CancellationToken) {
    info!(vault_id = vault.vault_id, owner = %vault.owner, "monitor: watching vault");
    let mut failures: u32 = 0;
    loop {
        let delay = match pipeline.assess(vault.vault_id, &vault.owner).await {
            Ok(result) => {
                if failures > 0 {
                    info!(vault_id = vault.vault_id, failures, "monitor: recovered");
                }
                failures = 0;
                info!(vault_id = vault.vault_id, score = result.score, "monitor: vault re-assessed");
                config.interval
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = backoff_with_jitter(failures, &config);
                warn!(
                    vault_id = vault.vault_id,
                    failures,
                    retry_in_secs = delay.as_secs(),
                    error = %e,
                    "monitor: assessment failed"
                );
                delay
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(vault_id = vault.vault_id, "monitor: stopped");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
