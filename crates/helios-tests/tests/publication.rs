//! Capability gating and batch publication against a counting ledger mock.

use std::sync::Arc;
use std::time::Duration;

use helios_core::traits::ChainClient;
use helios_core::types::*;
use helios_publisher::{OraclePublisher, PublisherConfig};
use helios_tests::helpers::*;

fn config() -> PublisherConfig {
    PublisherConfig {
        module_address: "0xcafe".to_string(),
        batch_delay: Duration::from_millis(1000),
    }
}

fn request(owner: &str, score: u8) -> PublishRequest {
    PublishRequest { vault_owner: owner.to_string(), score, risk_factors: None }
}

#[tokio::test]
async fn keyless_publisher_never_touches_the_ledger() {
    let chain = Arc::new(MockChainClient::healthy(Vec::new()));
    let publisher =
        OraclePublisher::detect(config(), None, Some(Arc::clone(&chain) as Arc<dyn ChainClient>)).await;
    assert_eq!(publisher.state(), CapabilityState::Degraded);

    let single = publisher.publish(OWNER, 70, None).await;
    let batch = publisher.publish_batch(&[request(OWNER, 10), request(OWNER, 20)]).await;
    let init = publisher.initialize_vault(1, 50).await;

    assert_eq!(single.status, PublicationStatus::Simulated);
    assert!(batch.iter().all(|r| r.status == PublicationStatus::Simulated));
    assert_eq!(init.status, PublicationStatus::Simulated);
    assert_eq!(chain.total_calls(), 0);
}

#[tokio::test]
async fn blank_key_counts_as_missing() {
    let chain = Arc::new(MockChainClient::healthy(Vec::new()));
    let publisher =
        OraclePublisher::detect(config(), Some("   "), Some(Arc::clone(&chain) as Arc<dyn ChainClient>)).await;
    assert_eq!(publisher.state(), CapabilityState::Degraded);
    assert_eq!(chain.total_calls(), 0);
}

#[tokio::test]
async fn unreachable_ledger_degrades_after_one_probe() {
    let chain = Arc::new(MockChainClient::down());
    let publisher =
        OraclePublisher::detect(config(), Some(TEST_KEY), Some(Arc::clone(&chain) as Arc<dyn ChainClient>)).await;

    assert_eq!(publisher.state(), CapabilityState::Degraded);
    assert_eq!(publisher.degraded_reason(), Some("ledger unreachable at startup"));

    let result = publisher.publish(OWNER, 70, None).await;
    assert_eq!(result.status, PublicationStatus::Simulated);
    assert_eq!(chain.total_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn batch_reports_partial_failure_in_order() {
    let chain = Arc::new(MockChainClient::healthy(Vec::new()).failing_submit(2));
    let publisher =
        OraclePublisher::detect(config(), Some(TEST_KEY), Some(Arc::clone(&chain) as Arc<dyn ChainClient>)).await;
    assert_eq!(publisher.state(), CapabilityState::Live);

    let requests = [request(OWNER, 80), request(OWNER, 65), request(OWNER, 40)];
    let start = tokio::time::Instant::now();
    let results = publisher.publish_batch(&requests).await;

    let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![PublicationStatus::Success, PublicationStatus::Error, PublicationStatus::Success]
    );
    let scores: Vec<_> = results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![80, 65, 40]);
    assert!(results[1].error_detail.as_deref().unwrap_or_default().contains("mempool full"));

    // Two gaps between three live submissions.
    assert!(start.elapsed() >= Duration::from_millis(2000));
    assert_eq!(chain.submit_count(), 3);
}

#[tokio::test]
async fn live_init_registers_the_updater() {
    let chain = Arc::new(MockChainClient::healthy(Vec::new()));
    let publisher =
        OraclePublisher::detect(config(), Some(TEST_KEY), Some(Arc::clone(&chain) as Arc<dyn ChainClient>)).await;
    let updater = publisher.address().expect("live publisher has an address");

    let result = publisher.initialize_vault(12, 50).await;

    assert_eq!(result.status, PublicationStatus::Success);
    assert_eq!(result.vault_owner, updater.to_hex());
    assert_eq!(result.score, 50);
    let submitted = chain.submitted.lock();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].sender, updater);
}
