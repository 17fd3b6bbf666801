//! Axum router and HTTP handlers.

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use helios_core::constants::{MAX_SCORE, NEUTRAL_SCORE};
use helios_core::error::StorageError;
use helios_core::types::{PublishRequest, RiskFactors, VaultId};

use crate::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/vaults/:id/health", get(vault_health))
        .route("/api/v1/vaults/:id/assess", post(assess_vault))
        .route("/api/v1/vaults/:id/oracle/init", post(init_oracle))
        .route("/api/v1/scores/publish", post(publish_scores))
        .route("/api/v1/status", get(status))
        .route("/api/v1/stats", get(stats))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(allowed)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub enum ApiError {
    BadRequest(String),
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Storage(e) => {
                warn!(error = %e, "storage failure while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

/// Scores arrive as plain JSON integers so out-of-range values get a JSON 400
/// instead of an extractor rejection.
fn check_score(score: i64) -> Result<u8, ApiError> {
    u8::try_from(score)
        .ok()
        .filter(|s| *s <= MAX_SCORE)
        .ok_or_else(|| ApiError::BadRequest(format!("score {score} outside 0..={MAX_SCORE}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` — service banner.
async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "Helios Risk Oracle",
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /api/v1/vaults/:id/health` — stored score, or the neutral default.
async fn vault_health(
    State(state): State<AppState>,
    Path(vault_id): Path<VaultId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pipeline.health(vault_id)?))
}

#[derive(Deserialize)]
struct AssessRequest {
    vault_owner: String,
    #[serde(default)]
    force_update: bool,
}

/// `POST /api/v1/vaults/:id/assess` — run an assessment now.
async fn assess_vault(
    State(state): State<AppState>,
    Path(vault_id): Path<VaultId>,
    Json(req): Json<AssessRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = req.vault_owner.trim();
    if owner.is_empty() {
        return Err(ApiError::BadRequest("vault_owner is required".into()));
    }
    info!(vault_id, %owner, force = req.force_update, "assessment requested");
    let result = state
        .pipeline
        .assess_unless_fresh(vault_id, owner, req.force_update)
        .await?;
    Ok(Json(result))
}

#[derive(Deserialize, Default)]
struct InitRequest {
    #[serde(default)]
    initial_score: Option<i64>,
}

/// `POST /api/v1/vaults/:id/oracle/init` — register the agent as updater.
async fn init_oracle(
    State(state): State<AppState>,
    Path(vault_id): Path<VaultId>,
    Json(req): Json<InitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let initial_score = match req.initial_score {
        Some(score) => check_score(score)?,
        None => NEUTRAL_SCORE,
    };
    let result = state.pipeline.publisher().initialize_vault(vault_id, initial_score).await;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct ScoreSubmission {
    vault_owner: String,
    score: i64,
    #[serde(default)]
    risk_factors: Option<RiskFactors>,
}

/// `POST /api/v1/scores/publish` — publish a batch of scores.
async fn publish_scores(
    State(state): State<AppState>,
    Json(submissions): Json<Vec<ScoreSubmission>>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = submissions
        .into_iter()
        .map(|s| {
            Ok(PublishRequest {
                vault_owner: s.vault_owner,
                score: check_score(s.score)?,
                risk_factors: s.risk_factors,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    let results = state.pipeline.publisher().publish_batch(&requests).await;
    Ok(Json(results))
}

/// `GET /api/v1/status` — capability state and upstream reachability.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pipeline.status().await)
}

/// `GET /api/v1/stats` — score table summary.
async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pipeline.storage().aggregate_stats()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use helios_agent_lib::{MemoryScoreStore, Pipeline, PipelineConfig};
    use helios_core::traits::{ChainClient, EventIndexClient, Storage};
    use helios_ingest::{Aggregator, AggregatorConfig, SimulatedCreditProvider};
    use helios_ledger::{IndexerConfig, IndexerRestClient, LedgerConfig, LedgerRestClient};
    use helios_publisher::{OraclePublisher, PublisherConfig};
    use helios_scoring::ScoringEngine;

    const OWNER: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

    /// Ledger clients point at a closed local port, so the ledger-backed
    /// sources fall back. The publisher is degraded.
    fn app() -> (Router, Arc<dyn Storage>) {
        let timeout = Duration::from_millis(500);
        let chain: Arc<dyn ChainClient> = Arc::new(
            LedgerRestClient::new(LedgerConfig {
                node_url: "http://127.0.0.1:9/v1".into(),
                request_timeout: timeout,
                health_timeout: timeout,
                ..LedgerConfig::default()
            })
            .unwrap(),
        );
        let index: Arc<dyn EventIndexClient> = Arc::new(
            IndexerRestClient::new(IndexerConfig {
                base_url: "http://127.0.0.1:9/v1".into(),
                request_timeout: timeout,
                health_timeout: timeout,
                ..IndexerConfig::default()
            })
            .unwrap(),
        );
        let storage: Arc<dyn Storage> = Arc::new(MemoryScoreStore::new());
        let aggregator = Aggregator::new(
            Arc::clone(&chain),
            Arc::clone(&index),
            Arc::new(SimulatedCreditProvider::new(Duration::ZERO)),
            AggregatorConfig { source_timeout: timeout, ..AggregatorConfig::default() },
        );
        let publisher = Arc::new(OraclePublisher::degraded(PublisherConfig::default(), "test"));
        let pipeline = Pipeline::new(
            aggregator,
            ScoringEngine::new(),
            Arc::clone(&storage),
            publisher,
            chain,
            index,
            PipelineConfig::default(),
        );
        let state = AppState { pipeline: Arc::new(pipeline) };
        (router(state, &["http://localhost:3000".to_string()]), storage)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_banner() {
        let (app, _) = app();
        let (status, body) = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "operational");
    }

    #[tokio::test]
    async fn unknown_vault_health_is_neutral() {
        let (app, _) = app();
        let (status, body) =
            send(app, Request::get("/api/v1/vaults/42/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vault_id"], 42);
        assert_eq!(body["score"], 50);
        assert_eq!(body["risk_factors"]["ltv_ratio"], 50);
    }

    #[tokio::test]
    async fn assess_stores_fallback_score() {
        let (app, storage) = app();
        let (status, body) = send(
            app,
            post_json("/api/v1/vaults/7/assess", json!({"vault_owner": OWNER, "force_update": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Fallback composition: two asset types. Simulated LTV 65.
        assert_eq!(body["risk_factors"]["asset_diversity"], 70);
        assert_eq!(body["risk_factors"]["ltv_ratio"], 85);
        assert_eq!(storage.get_score(7).unwrap().unwrap().score, body["score"].as_u64().unwrap() as u8);
    }

    #[tokio::test]
    async fn assess_requires_owner() {
        let (app, _) = app();
        let (status, body) =
            send(app, post_json("/api/v1/vaults/7/assess", json!({"vault_owner": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "vault_owner is required");
    }

    #[tokio::test]
    async fn publish_batch_is_simulated_when_degraded() {
        let (app, _) = app();
        let (status, body) = send(
            app,
            post_json(
                "/api/v1/scores/publish",
                json!([{"vault_owner": OWNER, "score": 61}, {"vault_owner": OWNER, "score": 40}]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|r| r["status"] == "simulated"));
    }

    #[tokio::test]
    async fn publish_rejects_out_of_range_score() {
        let (app, _) = app();
        let (status, _) = send(
            app,
            post_json("/api/v1/scores/publish", json!([{"vault_owner": OWNER, "score": 101}])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn scores_beyond_a_byte_get_json_400() {
        for score in [256, 300, -1] {
            let (app, _) = app();
            let (status, body) = send(
                app,
                post_json("/api/v1/scores/publish", json!([{"vault_owner": OWNER, "score": score}])),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "score {score}");
            assert!(body["error"].as_str().unwrap().contains(&score.to_string()));
        }

        let (app, _) = app();
        let (status, body) =
            send(app, post_json("/api/v1/vaults/3/oracle/init", json!({"initial_score": 500}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn oracle_init_defaults_to_neutral_score() {
        let (app, _) = app();
        let (status, body) = send(app, post_json("/api/v1/vaults/3/oracle/init", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "simulated");
        assert_eq!(body["score"], 50);
    }

    #[tokio::test]
    async fn status_reports_degraded_and_unreachable() {
        let (app, _) = app();
        let (status, body) =
            send(app, Request::get("/api/v1/status").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["capability_state"], "DEGRADED");
        assert_eq!(body["chain_reachable"], false);
        assert_eq!(body["index_reachable"], false);
    }

    #[tokio::test]
    async fn stats_after_assessment() {
        let (app, _) = app();
        let (_, _) = send(
            app.clone(),
            post_json("/api/v1/vaults/1/assess", json!({"vault_owner": OWNER})),
        )
        .await;
        let (status, body) = send(app, Request::get("/api/v1/stats").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn non_numeric_vault_id_is_rejected() {
        let (app, _) = app();
        let (status, _) =
            send(app, Request::get("/api/v1/vaults/abc/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
