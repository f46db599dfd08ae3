//! Error responses for the chat API

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdf_chat_core::{IngestError, SessionError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No route for {0}")]
    RouteNotFound(String),

    /// An extractor refused the request before the handler ran.
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        kind: &'static str,
        message: String,
    },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        let kind = match &rejection {
            _ if status == StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
            JsonRejection::MissingJsonContentType(_) => "unsupported_media_type",
            JsonRejection::JsonSyntaxError(_) => "invalid_json",
            _ => "invalid_body",
        };
        ApiError::Rejected {
            status,
            kind,
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            kind: "invalid_path",
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound(_) | ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Session(error) => match error {
                SessionError::NoIndex => StatusCode::CONFLICT,
                SessionError::EmptyQuestion => StatusCode::BAD_REQUEST,
                SessionError::Ingest(IngestError::EmptyDocumentSet) => StatusCode::BAD_REQUEST,
                SessionError::Ingest(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SessionError::Embedding(_) | SessionError::Generation(_) => StatusCode::BAD_GATEWAY,
                SessionError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::SessionNotFound(_) => "session_not_found",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::RouteNotFound(_) => "route_not_found",
            ApiError::Rejected { kind, .. } => *kind,
            ApiError::Session(error) => error.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::warn!(kind = self.kind(), "{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
