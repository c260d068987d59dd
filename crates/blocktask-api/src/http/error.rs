//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use blocktask_core::chat::ChatError;
use blocktask_core::codec::CodecError;
use blocktask_core::graph::GraphError;
use blocktask_types::error::RepositoryError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Repository(RepositoryError),
    Codec(CodecError),
    Graph(GraphError),
    Chat(ChatError),
    /// A path parameter named something that does not exist.
    NotFound(String),
    Validation(String),
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl From<CodecError> for AppError {
    fn from(e: CodecError) -> Self {
        AppError::Codec(e)
    }
}

impl From<GraphError> for AppError {
    fn from(e: GraphError) -> Self {
        AppError::Graph(e)
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found")),
            AppError::Repository(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", RepositoryError::NotFound.to_string())
            }
            AppError::Repository(RepositoryError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Repository(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Codec(e) => (StatusCode::BAD_REQUEST, "INVALID_DOCUMENT", e.to_string()),
            AppError::Graph(e) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_GRAPH", e.to_string()),
            AppError::Chat(e) => (StatusCode::CONFLICT, "CHAT_FINISHED", e.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, "{message}");
        } else {
            tracing::debug!(code, "{message}");
        }
        let body = ApiResponse::error(code, &message, uuid::Uuid::now_v7().to_string());
        (status, Json(body)).into_response()
    }
}
