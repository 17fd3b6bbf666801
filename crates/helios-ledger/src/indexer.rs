//! Event indexer REST client.
//!
//! `GET /accounts/{address}/events?limit=N&offset=M` returns `{ "data": [...] }`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use helios_core::error::IndexError;
use helios_core::traits::EventIndexClient;
use helios_core::types::VaultEvent;

use crate::config::IndexerConfig;

/// Address used for the reachability probe.
const PROBE_ACCOUNT: &str = "0x1";

pub struct IndexerRestClient {
    client: Client,
    config: IndexerConfig,
}

#[derive(Deserialize)]
struct EventsPage {
    #[serde(default)]
    data: Vec<VaultEvent>,
}

/// Decode an events page body.
pub fn parse_events_page(body: &str) -> Result<Vec<VaultEvent>, IndexError> {
    let page: EventsPage = serde_json::from_str(body).map_err(|e| IndexError::Decode(e.to_string()))?;
    Ok(page.data)
}

fn transport_error(e: reqwest::Error) -> IndexError {
    if e.is_timeout() {
        IndexError::Timeout
    } else {
        IndexError::Transport(e.to_string())
    }
}

impl IndexerRestClient {
    pub fn new(config: IndexerConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IndexError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.config.url(path))
            .header("X-API-KEY", &self.config.api_key)
            .header("Content-Type", "application/json")
    }
}

#[async_trait]
impl EventIndexClient for IndexerRestClient {
    async fn list_events(
        &self,
        address: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<VaultEvent>, IndexError> {
        let resp = self
            .get(&format!("accounts/{address}/events"))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IndexError::Status { status: status.as_u16() });
        }
        let body = resp.text().await.map_err(transport_error)?;
        parse_events_page(&body)
    }

    async fn health_check(&self) -> bool {
        let result = self
            .get(&format!("accounts/{PROBE_ACCOUNT}"))
            .timeout(self.config.health_timeout)
            .send()
            .await;
        match result {
            Ok(resp) => resp.status().as_u16() == 200,
            Err(e) => {
                warn!(indexer = %self.config.base_url, error = %e, "indexer: health check failed");
                false
            }
        }
    }
}
