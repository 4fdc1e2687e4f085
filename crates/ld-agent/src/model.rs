//! The text-generation seam

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when calling the generative-text service
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Model API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model API key is not configured")]
    MissingApiKey,
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Single-turn prompt-in/text-out generation.
///
/// The whole conversation state is rendered into the prompt by the
/// caller; the service itself is stateless.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> ModelResult<String>;
}
