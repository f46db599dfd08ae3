//! HTTP handlers for the chat UI

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        DefaultBodyLimit, Path, State,
    },
    http::{StatusCode, Uri},
    response::Html,
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pdf_chat_core::{ChatSession, PdfDocument};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    AskRequest, AskResponse, CreateSessionResponse, HistoryResponse, ProcessRequest,
    ProcessResponse,
};
use crate::state::AppState;
use crate::templates;

type SessionId = Result<Path<Uuid>, PathRejection>;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/session", post(create_session))
        .route("/api/session/:id", delete(delete_session))
        .route("/api/session/:id/process", post(process_documents))
        .route("/api/session/:id/ask", post(ask_question))
        .route("/api/session/:id/history", get(get_history))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn index() -> Html<String> {
    Html(templates::index_page())
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

async fn find_session(
    state: &AppState,
    id: SessionId,
) -> Result<Arc<Mutex<ChatSession>>, ApiError> {
    let Path(id) = id?;
    state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let (session_id, created_at) = state.sessions.create(state.pipeline.clone()).await;
    let live_sessions = state.sessions.len().await;
    info!(%session_id, live_sessions, "session created");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            created_at,
        }),
    )
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    id: SessionId,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if state.sessions.remove(id).await {
        info!(session_id = %id, "session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

/// Replaces the session's index with one built from the uploaded PDFs.
pub async fn process_documents(
    State(state): State<Arc<AppState>>,
    id: SessionId,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    let Json(req) = payload?;

    let documents = req
        .documents
        .into_iter()
        .map(|upload| {
            let bytes = BASE64.decode(upload.content_base64.trim()).map_err(|e| {
                ApiError::InvalidRequest(format!("Invalid base64 for {}: {}", upload.name, e))
            })?;
            Ok(PdfDocument::new(upload.name, bytes))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let mut session = session.lock().await;
    let session_id = session.id();
    let summary = session.process(&documents).await?.clone();
    crate::log_process_summary(&summary);

    Ok(Json(ProcessResponse {
        session_id,
        summary,
    }))
}

pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    id: SessionId,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    let Json(req) = payload?;

    let mut session = session.lock().await;
    let answer = session.ask(&req.question).await?;
    info!(
        session_id = %session.id(),
        sources = answer.sources.len(),
        exchanges = session.history().exchanges(),
        "question answered"
    );

    let turns = session.history().turns();
    let transcript_html = templates::render_transcript(turns);
    Ok(Json(AskResponse::new(answer, turns, transcript_html)))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    id: SessionId,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = find_session(&state, id).await?;

    let session = session.lock().await;
    let turns = session.history().turns();
    Ok(Json(HistoryResponse {
        ready: session.is_ready(),
        history: turns.to_vec(),
        transcript_html: templates::render_transcript(turns),
    }))
}
