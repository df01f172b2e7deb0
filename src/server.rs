//! HTTP server exposing the query, feedback, and admin surfaces.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/answer` | Answer a question `{user_id, question, rewrite?}` |
//! | `POST`   | `/feedback` | Log a rating `{user_id, question, rating}` |
//! | `GET`    | `/knowledge` | List all entries (admin) |
//! | `POST`   | `/knowledge` | Add an entry `{question, answer}` (admin) |
//! | `DELETE` | `/knowledge` | Remove entries `{question}` (admin) |
//! | `POST`   | `/knowledge/clear` | Delete every entry (admin) |
//!
//! Admin endpoints read the caller identity from the `x-user-id` header and
//! check it against `[auth].admin_ids`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid embedding: cannot embed empty text" } }
//! ```
//!
//! Error codes: `bad_request` (400), `forbidden` (403), `internal` (500).

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use qa_harness_core::error::QaError;
use qa_harness_core::models::{KnowledgePair, Principal};
use qa_harness_core::service::{AnswerOutcome, KnowledgeService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::app::{build_service, LogDelivery};
use crate::auth::resolve_principal;
use crate::config::{AuthConfig, Config};

/// Header carrying the caller's identity.
pub const USER_HEADER: &str = "x-user-id";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: KnowledgeService,
    auth: Arc<AuthConfig>,
}

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = build_service(config, LogDelivery::Background).await?;
    let app = router(service, config.auth.clone());

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("QA server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over an already assembled service.
pub fn router(service: KnowledgeService, auth: AuthConfig) -> Router {
    let state = AppState {
        service,
        auth: Arc::new(auth),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/answer", post(handle_answer))
        .route("/feedback", post(handle_feedback))
        .route(
            "/knowledge",
            get(handle_list).post(handle_add).delete(handle_remove),
        )
        .route("/knowledge/clear", post(handle_clear))
        .layer(cors)
        .with_state(state)
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

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        let (status, code) = match &err {
            QaError::Unauthorized(_) => (StatusCode::FORBIDDEN, "forbidden"),
            e if e.is_client_error() => (StatusCode::BAD_REQUEST, "bad_request"),
            _ => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

fn principal(state: &AppState, headers: &HeaderMap) -> Principal {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    resolve_principal(&state.auth, user_id)
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

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    user_id: String,
    question: String,
    #[serde(default = "default_true")]
    rewrite: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct AnswerResponse {
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    was_rewritten: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f32>,
}

async fn handle_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let outcome = state
        .service
        .answer(&req.user_id, &req.question, req.rewrite)
        .await?;

    Ok(Json(match outcome {
        AnswerOutcome::Answered(a) => AnswerResponse {
            matched: true,
            text: Some(a.text),
            was_rewritten: a.was_rewritten,
            matched_question: Some(a.matched_question),
            similarity: Some(a.similarity),
        },
        AnswerOutcome::NoMatch => AnswerResponse {
            matched: false,
            text: None,
            was_rewritten: false,
            matched_question: None,
            similarity: None,
        },
    }))
}

// ============ POST /feedback ============

#[derive(Deserialize)]
struct FeedbackRequest {
    user_id: String,
    question: String,
    rating: i64,
}

async fn handle_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<StatusCode, AppError> {
    state
        .service
        .submit_feedback(&req.user_id, &req.question, req.rating)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ /knowledge ============

#[derive(Serialize)]
struct ListResponse {
    entries: Vec<KnowledgePair>,
}

async fn handle_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, AppError> {
    let entries = state.service.list(&principal(&state, &headers)).await?;
    Ok(Json(ListResponse { entries }))
}

#[derive(Deserialize)]
struct AddRequest {
    question: String,
    answer: String,
}

async fn handle_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddRequest>,
) -> Result<StatusCode, AppError> {
    state
        .service
        .add(&principal(&state, &headers), &req.question, &req.answer)
        .await?;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
struct RemoveRequest {
    question: String,
}

#[derive(Serialize)]
struct RemoveResponse {
    removed: bool,
}

async fn handle_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<RemoveResponse>, AppError> {
    let removed = state
        .service
        .remove(&principal(&state, &headers), &req.question)
        .await?;
    Ok(Json(RemoveResponse { removed }))
}

#[derive(Serialize)]
struct ClearResponse {
    removed: u64,
}

async fn handle_clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClearResponse>, AppError> {
    let removed = state.service.clear(&principal(&state, &headers)).await?;
    Ok(Json(ClearResponse { removed }))
}
