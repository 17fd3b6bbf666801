//! Fullnode REST client.
//!
//! Endpoints used:
//! - `GET  /accounts/{address}/resources`
//! - `POST /transactions`
//! - `GET  /transactions/wait_by_hash/{hash}` (long-poll, repeated while pending)
//! - `GET  /` ledger info, for the reachability probe

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use helios_core::error::ChainError;
use helios_core::traits::ChainClient;
use helios_core::types::{lenient, LedgerResource, SignedPayload, TransactionReceipt};

use crate::config::LedgerConfig;

pub struct LedgerRestClient {
    client: Client,
    config: LedgerConfig,
}

impl LedgerRestClient {
    pub fn new(config: LedgerConfig) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn get_json(&self, path: &str, timeout: Option<Duration>) -> Result<Value, ChainError> {
        let mut req = self.client.get(self.config.url(path));
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await.map_err(transport_error)?;
        read_json(resp).await
    }
}

fn transport_error(e: reqwest::Error) -> ChainError {
    if e.is_timeout() {
        ChainError::Timeout
    } else {
        ChainError::Transport(e.to_string())
    }
}

async fn read_json(resp: Response) -> Result<Value, ChainError> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(ChainError::Status { status: status.as_u16(), body });
    }
    serde_json::from_str(&body).map_err(|e| ChainError::Decode(e.to_string()))
}

/// Decode the body of `GET /accounts/{address}/resources`.
pub fn parse_resources(body: Value) -> Result<Vec<LedgerResource>, ChainError> {
    serde_json::from_value(body).map_err(|e| ChainError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct SubmitResponse {
    hash: String,
}

#[derive(Deserialize)]
struct TransactionInfo {
    #[serde(rename = "type", default)]
    kind: String,
    hash: String,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    vm_status: String,
    #[serde(default, deserialize_with = "lenient::u64")]
    gas_used: u64,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    version: Option<u64>,
}

/// Outcome of one confirmation poll.
#[derive(Debug, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Committed(TransactionReceipt),
}

/// Decode a transaction-by-hash response.
pub fn parse_confirmation(body: Value) -> Result<Confirmation, ChainError> {
    let info: TransactionInfo =
        serde_json::from_value(body).map_err(|e| ChainError::Decode(e.to_string()))?;
    if info.kind == "pending_transaction" {
        return Ok(Confirmation::Pending);
    }
    if !info.success {
        return Err(ChainError::Rejected { tx_ref: info.hash, vm_status: info.vm_status });
    }
    Ok(Confirmation::Committed(TransactionReceipt {
        tx_ref: info.hash,
        gas_used: info.gas_used,
        version: info.version,
    }))
}

#[async_trait]
impl ChainClient for LedgerRestClient {
    async fn read_account_resources(&self, address: &str) -> Result<Vec<LedgerResource>, ChainError> {
        let body = self.get_json(&format!("accounts/{address}/resources"), None).await?;
        parse_resources(body)
    }

    async fn submit_transaction(&self, payload: &SignedPayload) -> Result<String, ChainError> {
        let resp = self
            .client
            .post(self.config.url("transactions"))
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_json(resp).await?;
        let submitted: SubmitResponse =
            serde_json::from_value(body).map_err(|e| ChainError::Decode(e.to_string()))?;
        debug!(tx_ref = %submitted.hash, "ledger: transaction submitted");
        Ok(submitted.hash)
    }

    async fn await_confirmation(&self, tx_ref: &str) -> Result<TransactionReceipt, ChainError> {
        let path = format!("transactions/wait_by_hash/{tx_ref}");
        let poll = async {
            loop {
                match self.get_json(&path, None).await {
                    Ok(body) => match parse_confirmation(body) {
                        Ok(Confirmation::Committed(receipt)) => return Ok(receipt),
                        Ok(Confirmation::Pending) => {}
                        Err(e) => return Err(e),
                    },
                    // Not yet visible to the node.
                    Err(ChainError::Status { status: 404, .. }) => {}
                    Err(ChainError::Timeout) => {}
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };
        tokio::time::timeout(self.config.confirmation_timeout, poll)
            .await
            .map_err(|_| ChainError::Timeout)?
    }

    async fn health_check(&self) -> bool {
        match self.get_json("", Some(self.config.health_timeout)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(node = %self.config.node_url, error = %e, "ledger: health check failed");
                false
            }
        }
    }
}
