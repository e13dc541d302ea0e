//! HTTP API for the knowledge-base service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/rag/query` | Answer a query with ranked chunks |
//! | `POST` | `/api/rag/query/forward` | Answer and forward to the webhook |
//! | `POST` | `/api/rag/reload` | Full ingestion pass over the source tree |
//! | `POST` | `/api/rag/refresh` | Re-ingest changed documents only |
//! | `GET`  | `/api/rag/status` | Knowledge-base freshness snapshot |
//! | `GET`  | `/api/rag/documents` | Paged document listing |
//! | `GET`  | `/api/rag/faqs` | Curated FAQ listing |
//! | `POST` | `/api/rag/members/sync` | Replace the member roster document |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one JSON shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `webhook_failed` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::answer::AnswerService;
use crate::faq::{self, Faq};
use crate::ingest::{IngestSummary, Ingestor};
use crate::members::MemberRecord;
use crate::models::{DocumentInfo, RagQuery, RagResponse, UpdateStatus};
use crate::store::KnowledgeStore;
use crate::webhook::WebhookClient;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn KnowledgeStore>,
    ingestor: Arc<Ingestor>,
    answers: Arc<AnswerService>,
    webhook: Arc<WebhookClient>,
}

/// Start the HTTP server on `bind_addr`. Runs until the process exits.
pub async fn run_server(
    bind_addr: &str,
    store: Arc<dyn KnowledgeStore>,
    ingestor: Arc<Ingestor>,
    answers: Arc<AnswerService>,
    webhook: Arc<WebhookClient>,
) -> anyhow::Result<()> {
    let state = AppState {
        store,
        ingestor,
        answers,
        webhook,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/rag/query", post(handle_query))
        .route("/api/rag/query/forward", post(handle_query_forward))
        .route("/api/rag/reload", post(handle_reload))
        .route("/api/rag/refresh", post(handle_refresh))
        .route("/api/rag/status", get(handle_status))
        .route("/api/rag/documents", get(handle_documents))
        .route("/api/rag/faqs", get(handle_faqs))
        .route("/api/rag/members/sync", post(handle_members_sync))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!(addr = %bind_addr, "knowledge-base server listening");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn webhook_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "webhook_failed".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map pipeline errors to HTTP status codes. Validation failures carry
/// known message fragments; everything else is a 500.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("must not be empty") || msg.contains("not configured") {
        bad_request(msg)
    } else {
        error!(%msg, "request failed");
        internal(msg)
    }
}

// ============ POST /api/rag/query ============

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<RagQuery>,
) -> Result<Json<RagResponse>, AppError> {
    let response = state.answers.answer(&request).await.map_err(classify_error)?;
    Ok(Json(response))
}

// ============ POST /api/rag/query/forward ============

async fn handle_query_forward(
    State(state): State<AppState>,
    Json(request): Json<RagQuery>,
) -> Result<Json<RagResponse>, AppError> {
    if !state.webhook.is_configured() {
        return Err(bad_request("webhook URL is not configured"));
    }

    let mut response = state.answers.answer(&request).await.map_err(classify_error)?;

    // A FAQ hit is already a complete answer and is returned as-is.
    if response.relevant_chunks.is_empty() && faq::find_exact_match(&response.query).is_some() {
        return Ok(Json(response));
    }

    let forwarded = state
        .webhook
        .forward(&response.enhanced_query, &response.query, &response.relevant_chunks)
        .await
        .map_err(|err| webhook_failed(err.to_string()))?;
    response.webhook_response = Some(forwarded);

    Ok(Json(response))
}

// ============ POST /api/rag/reload and /api/rag/refresh ============

#[derive(Serialize)]
struct IngestResponse {
    processed: usize,
    skipped: usize,
    removed: usize,
    documents_count: i64,
    chunks_count: i64,
    processing_time: f64,
}

async fn ingest_response(
    state: &AppState,
    summary: IngestSummary,
    processing_time: f64,
) -> Result<IngestResponse, AppError> {
    let (documents_count, chunks_count) =
        state.store.counts().await.map_err(classify_error)?;
    Ok(IngestResponse {
        processed: summary.processed,
        skipped: summary.skipped,
        removed: summary.removed,
        documents_count,
        chunks_count,
        processing_time,
    })
}

async fn handle_reload(State(state): State<AppState>) -> Result<Json<IngestResponse>, AppError> {
    let started = std::time::Instant::now();
    let summary = state.ingestor.load_all().await.map_err(classify_error)?;
    let elapsed = started.elapsed().as_secs_f64();
    Ok(Json(ingest_response(&state, summary, elapsed).await?))
}

async fn handle_refresh(State(state): State<AppState>) -> Result<Json<IngestResponse>, AppError> {
    let started = std::time::Instant::now();
    let summary = state.ingestor.refresh().await.map_err(classify_error)?;
    let elapsed = started.elapsed().as_secs_f64();
    Ok(Json(ingest_response(&state, summary, elapsed).await?))
}

// ============ GET /api/rag/status ============

async fn handle_status(State(state): State<AppState>) -> Result<Json<UpdateStatus>, AppError> {
    let status = state.ingestor.status().await.map_err(classify_error)?;
    Ok(Json(status))
}

// ============ GET /api/rag/documents ============

#[derive(Deserialize)]
struct DocumentsParams {
    #[serde(default)]
    page: i64,
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentInfo>,
    total: i64,
    page: i64,
    limit: i64,
}

/// Effective paging values: 1-based page, limit defaulted to 10 and capped
/// at 100. The response echoes these, not the caller's raw input.
fn effective_paging(page: i64, limit: i64) -> (i64, i64) {
    let page = page.max(1);
    let limit = if limit <= 0 { 10 } else { limit.min(100) };
    (page, limit)
}

async fn handle_documents(
    State(state): State<AppState>,
    Query(params): Query<DocumentsParams>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let (page, limit) = effective_paging(params.page, params.limit);
    let category = params.category.as_deref().filter(|c| !c.is_empty());

    let documents = state
        .store
        .list_documents(page, limit, category)
        .await
        .map_err(classify_error)?;
    let total = state
        .store
        .count_documents(category)
        .await
        .map_err(classify_error)?;

    Ok(Json(DocumentsResponse {
        documents,
        total,
        page,
        limit,
    }))
}

// ============ GET /api/rag/faqs ============

#[derive(Deserialize)]
struct FaqsParams {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Serialize)]
struct FaqsResponse {
    faqs: Vec<&'static Faq>,
    total: usize,
}

async fn handle_faqs(Query(params): Query<FaqsParams>) -> Json<FaqsResponse> {
    let category = params.category.as_deref().filter(|c| !c.is_empty());
    let faqs = faq::all(category);
    let total = faqs.len();
    Json(FaqsResponse { faqs, total })
}

// ============ POST /api/rag/members/sync ============

#[derive(Serialize)]
struct MembersSyncResponse {
    synced: usize,
    documents_count: i64,
    chunks_count: i64,
}

async fn handle_members_sync(
    State(state): State<AppState>,
    Json(members): Json<Vec<MemberRecord>>,
) -> Result<Json<MembersSyncResponse>, AppError> {
    state
        .ingestor
        .sync_members(&members)
        .await
        .map_err(classify_error)?;
    let (documents_count, chunks_count) =
        state.store.counts().await.map_err(classify_error)?;

    Ok(Json(MembersSyncResponse {
        synced: members.len(),
        documents_count,
        chunks_count,
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
