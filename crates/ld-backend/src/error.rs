//! Error types for backend operations

use thiserror::Error;

/// Errors that can occur when talking to the managed backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid authentication credentials")]
    Unauthorized,

    #[error("Backend returned error status {status}: {message}")]
    Api { status: u16, message: String },
}

/// Result type alias for backend operations
pub type StoreResult<T> = Result<T, StoreError>;
