//! Ollama HTTP client implementing [`LlmClient`]
//!
//! Non-streaming `/api/generate` calls; a 429 from the server is surfaced
//! as the rate-limit error kind so callers can back off.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// HTTP client for the Ollama generate API
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a client for the given model
    pub fn new(base_url: Option<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, LlmError> {
        let url = format!("{}/api/generate", self.base_url);

        let mut body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
        });
        if request.extract_json {
            body["format"] = json!("json");
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider(format!("Failed to connect to Ollama: {e}")))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimit(format!(
                "Ollama API returned {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(LlmError::Provider(format!(
                "Ollama API error: {}",
                response.status()
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Provider(format!("Failed to parse response: {e}")))?;

        let mut completion = CompletionResponse {
            text: generated.response,
            highlight_data: None,
            confidence_data: None,
        };

        if let Some(hook) = request.process_text {
            let processed = hook(&completion.text);
            completion.highlight_data = processed.highlight_data;
            completion.confidence_data = processed.confidence_data;
        }

        Ok(completion)
    }
}
