//! Server error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use remedia_llm::LLMError;
use remedia_pipeline::PipelineError;
use serde_json::json;
use std::fmt;

/// Server error type
#[derive(Debug)]
pub enum ServerError {
    /// Invalid request
    InvalidRequest(String),

    /// Missing, expired or mismatched URL signature
    Forbidden(String),

    /// Not found
    NotFound(String),

    /// Model provider failed or answered unexpectedly
    Upstream(String),

    /// Internal server error
    InternalError(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ServerError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServerError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            ServerError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ServerError::InvalidRequest(msg)
            | ServerError::Forbidden(msg)
            | ServerError::NotFound(msg)
            | ServerError::Upstream(msg)
            | ServerError::InternalError(msg) => msg,
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound { .. } => ServerError::NotFound(err.to_string()),
            PipelineError::InvalidTrigger(_)
            | PipelineError::InputData(_)
            | PipelineError::Presign(_) => ServerError::InvalidRequest(err.to_string()),
            other => ServerError::InternalError(other.to_string()),
        }
    }
}

impl From<LLMError> for ServerError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Configuration(_) | LLMError::SecretStore(_) => {
                ServerError::InternalError(err.to_string())
            }
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::InternalError(err.to_string())
    }
}
