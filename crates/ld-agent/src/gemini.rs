//! Production text model speaking the Gemini `generateContent` API

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{ModelError, ModelResult, TextModel};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Client for the Gemini generative-text API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    base_url: Url,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a client for the default endpoint and model.
    ///
    /// Fails with [`ModelError::MissingApiKey`] when the key is empty so
    /// the server can degrade to its unavailable state instead of
    /// issuing doomed requests.
    pub fn new(api_key: impl Into<String>) -> ModelResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let http_client = HttpClient::builder()
            .user_agent("labdesk-server/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            http_client,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        let mut url = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self.http_client.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: GenerateResponse = response.json().await?;
        let text = data
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_is_rejected() {
        assert!(matches!(
            GeminiClient::new(""),
            Err(ModelError::MissingApiKey)
        ));
    }

    #[test]
    fn test_response_text_concatenation() {
        let data: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Hello " }, { "text": "world" } ] } }
            ]
        }))
        .unwrap();
        let text: String = data.candidates[0]
            .content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect();
        assert_eq!(text, "Hello world");
    }
}
