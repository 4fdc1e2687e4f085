//! Request error taxonomy and HTTP status mapping
//!
//! A closed set of failure kinds replaces blanket catch-to-500 handling:
//! deliberate failures (auth, ownership, preconditions) map to their
//! status codes, and everything else from the collaborators surfaces as a
//! 500 carrying the underlying message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ld_agent::ModelError;
use ld_api_contract::ErrorBody;
use ld_backend::StoreError;

/// Failure kinds the route layer distinguishes
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Invalid authentication credentials")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("AI agent service is not available")]
    AgentUnavailable,

    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl ErrorKind {
    fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
            ErrorKind::AgentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Remote(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound(_) => "not_found",
            ErrorKind::Validation(_) => "validation",
            ErrorKind::AgentUnavailable => "agent_unavailable",
            ErrorKind::Remote(_) => "remote_failure",
        }
    }
}

/// Error type returned by every handler
#[derive(Debug)]
pub struct ServerError {
    kind: ErrorKind,
}

impl ServerError {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// Result type alias for handlers
pub type ServerResult<T> = Result<T, ServerError>;

impl From<ErrorKind> for ServerError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl From<StoreError> for ServerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unauthorized => ErrorKind::Unauthorized.into(),
            other => ErrorKind::Remote(other.into()).into(),
        }
    }
}

impl From<ModelError> for ServerError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::MissingApiKey => ErrorKind::AgentUnavailable.into(),
            other => ErrorKind::Remote(other.into()).into(),
        }
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ErrorKind::Validation(errors.to_string()).into()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        if status.is_server_error() {
            tracing::error!(error = %self.kind, "request failed");
        }
        let body = ErrorBody::new(self.kind.code(), self.kind.to_string());
        (status, Json(body)).into_response()
    }
}
