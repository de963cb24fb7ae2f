//! HTTP surface for claim checks (`factcheck serve`).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use color_eyre::eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use factcheck_core::{CheckOutcome, EvidencePipeline, VerdictCode, validate_claim};
use factcheck_shared::{ClaimKind, DefaultsConfig, FactCheckError, ServerConfig, char_len};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const MSG_NOT_FOUND: &str = "Endpoint không tồn tại";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /api/check`. Accepts camelCase and snake_case keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "input_type")]
    pub input_type: ClaimKind,
    #[serde(default, alias = "num_sources")]
    pub num_sources: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerdictView {
    pub label: String,
    pub code: VerdictCode,
    pub explanation: String,
    pub color: String,
    pub similarity_percentage: f64,
    pub confidence_percentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReferenceView {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub source: String,
    pub similarity_percentage: f64,
}

/// Response of `POST /api/check`, also printed by `factcheck check --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<ReferenceView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Score in `[0, 1]` as a percentage with two decimals.
pub(crate) fn percent(score: f64) -> f64 {
    (score * 10_000.0).round() / 100.0
}

impl From<&CheckOutcome> for CheckResponse {
    fn from(outcome: &CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Terminal { message, .. } => Self {
                success: false,
                message: Some(message.clone()),
                verdict: None,
                references: None,
                keywords: None,
                timestamp: None,
            },
            CheckOutcome::Success(report) => Self {
                success: true,
                message: None,
                verdict: Some(VerdictView {
                    label: report.verdict.label.clone(),
                    code: report.verdict.code,
                    explanation: report.verdict.explanation.clone(),
                    color: report.verdict.color.clone(),
                    similarity_percentage: percent(report.verdict.similarity),
                    confidence_percentage: percent(report.verdict.confidence),
                }),
                references: Some(
                    report
                        .references
                        .iter()
                        .map(|r| ReferenceView {
                            title: r.title.clone(),
                            url: r.url.clone(),
                            domain: r.domain.clone(),
                            source: r.source.clone(),
                            similarity_percentage: percent(r.similarity),
                        })
                        .collect(),
                ),
                keywords: Some(report.keywords.clone()),
                timestamp: Some(report.timestamp),
            },
        }
    }
}

/// Request rejected before the pipeline runs.
#[derive(Debug)]
pub(crate) struct BadRequest(String);

impl From<FactCheckError> for BadRequest {
    fn from(e: FactCheckError) -> Self {
        match e {
            FactCheckError::Validation { message } => Self(message),
            other => Self(other.to_string()),
        }
    }
}

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "message": self.0 });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Shared handler state. The pipeline is built once per process.
#[derive(Clone)]
pub(crate) struct AppState {
    pipeline: Arc<EvidencePipeline>,
    defaults: DefaultsConfig,
}

impl AppState {
    pub(crate) fn new(pipeline: Arc<EvidencePipeline>, defaults: DefaultsConfig) -> Self {
        Self { pipeline, defaults }
    }
}

/// CORS policy for the configured origins. `"*"` allows any origin.
pub(crate) fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

pub(crate) fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/check", post(check))
        .route("/api/trusted-sources", get(trusted_sources))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub(crate) async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = router(state, cors_layer(&config.cors_origins));

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| eyre!("failed to bind {}:{}: {e}", config.host, config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, "server listening");
    println!("Fact-check API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "online",
        "message": "Fake News Detection API is running",
        "version": VERSION,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "factCheckerInitialized": true,
        "endpoints": { "check": "/api/check", "health": "/health" },
    }))
}

async fn trusted_sources(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sources: Vec<String> = state
        .pipeline
        .trusted_sources()
        .into_iter()
        .map(|s| s.name)
        .collect();
    Json(json!({ "count": sources.len(), "sources": sources }))
}

async fn check(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CheckRequest>, JsonRejection>,
) -> std::result::Result<Json<CheckResponse>, BadRequest> {
    let Json(request) = payload.map_err(|e| BadRequest(e.body_text()))?;

    let requested = request
        .num_sources
        .unwrap_or(state.defaults.num_sources as i64);
    let (claim, count) = validate_claim(
        &request.content,
        request.input_type,
        requested,
        state.defaults.max_num_sources,
    )?;

    let request_id = Uuid::now_v7();
    let span = info_span!("check_request", %request_id, kind = %claim.kind, count);
    let outcome = async {
        info!(chars = char_len(&claim.raw_input), "new check request");
        state.pipeline.run(&claim, count).await
    }
    .instrument(span)
    .await;

    Ok(Json(CheckResponse::from(&outcome)))
}

async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": MSG_NOT_FOUND,
            "path": uri.to_string(),
        })),
    )
}
