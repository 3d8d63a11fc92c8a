//! HTTP request handlers

use super::sse::{candidate_stream, reply_stream};
use super::types::{
    BeamTreeRequest, CandidatesRequest, ErrorResponse, ExpandBreadthRequest,
    ExpandBreadthResponse, ExpandDepthRequest, ExpandDepthResponse, GenerateRequest,
    HistoryResponse, ResetRequest, SuccessResponse, VersionResponse,
};
use super::AppState;
use crate::candidates::CandidateGenerator;
use crate::engine::{Engine, TurnRequest};
use crate::explorer::{BeamTree, ExploreError};
use crate::sampler::SamplingParams;
use crate::validation::ValidationError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Buffered events per stream before the generator waits on the client
const EVENT_BUFFER: usize = 64;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversation turns
        .route("/api/generate", post(generate))
        .route("/api/reset", post(reset))
        .route("/api/history/:session_id", get(get_history))
        // Probability tree
        .route("/api/beam-tree", post(beam_tree))
        .route("/api/expand-depth", post(expand_depth))
        .route("/api/expand-breadth", post(expand_breadth))
        // Ranking candidates
        .route("/api/grpo-generate", post(grpo_generate))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversation
// ============================================================

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let request = TurnRequest {
        session_id: req.session_id,
        message: req.message,
        history: req.history,
        auto_start: req.auto_start,
    };
    request.validate()?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let engine = state.engine.clone();
    tokio::spawn(async move { engine.run_turn(request, tx).await });

    Ok(reply_stream(rx))
}

async fn reset(
    State(state): State<AppState>,
    payload: Option<Json<ResetRequest>>,
) -> Json<SuccessResponse> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    state.engine.reset(&req.session_id).await;
    Json(SuccessResponse { success: true })
}

async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let history = state.engine.history(&session_id).await;
    Json(HistoryResponse {
        session_id,
        history,
    })
}

// ============================================================
// Probability Tree
// ============================================================

async fn beam_tree(
    State(state): State<AppState>,
    payload: Result<Json<BeamTreeRequest>, JsonRejection>,
) -> Result<Json<BeamTree>, AppError> {
    let Json(req) = payload?;
    let prompt = req.prompt.trim().to_string();

    let tree = spawn_cancellable(&state, move |engine, cancel| async move {
        engine.explorer().build(&prompt, req.k, req.n, &cancel).await
    })
    .await?;

    Ok(Json(tree))
}

async fn expand_depth(
    State(state): State<AppState>,
    payload: Result<Json<ExpandDepthRequest>, JsonRejection>,
) -> Result<Json<ExpandDepthResponse>, AppError> {
    let Json(req) = payload?;

    let children_map = spawn_cancellable(&state, move |engine, cancel| async move {
        engine
            .explorer()
            .expand_depth(&req.prompt, &req.nodes, req.k, &cancel)
            .await
    })
    .await?;

    Ok(Json(ExpandDepthResponse { children_map }))
}

async fn expand_breadth(
    State(state): State<AppState>,
    payload: Result<Json<ExpandBreadthRequest>, JsonRejection>,
) -> Result<Json<ExpandBreadthResponse>, AppError> {
    let Json(req) = payload?;

    let new_tokens = spawn_cancellable(&state, move |engine, cancel| async move {
        engine
            .explorer()
            .expand_breadth(
                &req.prompt,
                &req.path,
                req.current_k,
                req.additional_k,
                req.n,
                &cancel,
            )
            .await
    })
    .await?;

    Ok(Json(ExpandBreadthResponse { new_tokens }))
}

/// Run tree work on its own task, cancelled if this handler is dropped
async fn spawn_cancellable<T, F, Fut>(state: &AppState, work: F) -> Result<T, AppError>
where
    F: FnOnce(Arc<Engine>, CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, ExploreError>> + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let task = tokio::spawn(work(state.engine.clone(), cancel));

    task.await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

// ============================================================
// Ranking Candidates
// ============================================================

async fn grpo_generate(
    State(state): State<AppState>,
    payload: Result<Json<CandidatesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let prompt = req.prompt.trim().to_string();
    let params = SamplingParams::from_flags(req.temperature, req.use_top_k, req.top_k, req.top_p);
    CandidateGenerator::validate(&prompt, &params)?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let engine = state.engine.clone();
    tokio::spawn(async move { engine.run_candidates(prompt, params, tx).await });

    Ok(candidate_stream(rx))
}

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<ExploreError> for AppError {
    fn from(e: ExploreError) -> Self {
        match e {
            ExploreError::Validation(e) => e.into(),
            ExploreError::Oracle(e) => {
                tracing::error!(error = %e, "Tree exploration failed");
                AppError::BadGateway(e.to_string())
            }
            ExploreError::Cancelled => AppError::Internal("Exploration cancelled".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
