//! Model completion seam
//!
//! The engine never talks to a provider directly; it goes through
//! [`LlmClient`], which returns either a completed answer or a provider
//! error split into rate-limit vs generic kinds so callers can apply their
//! own backoff to the former.

pub mod executor;
pub mod ollama;

pub use executor::{run_completion, CompletionOutcome};
pub use ollama::OllamaClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Provider error, classified for caller-side retry decisions
#[derive(Error, Debug)]
pub enum LlmError {
    /// Provider throttling; the caller may back off and retry
    #[error("rate limited: {0}")]
    RateLimit(String),
    /// Any other provider failure
    #[error("{0}")]
    Provider(String),
}

/// Annotations produced by a post-processing hook over the raw answer
#[derive(Debug, Clone, Default)]
pub struct ProcessedText {
    pub highlight_data: Option<Value>,
    pub confidence_data: Option<Value>,
}

/// Hook run over the raw answer text before the response is returned,
/// typically installed by the highlighting plugin
pub type PostProcess = Arc<dyn Fn(&str) -> ProcessedText + Send + Sync>;

/// One completion request
pub struct CompletionRequest {
    pub prompt: String,
    /// Ask the provider for JSON instead of plain text
    pub extract_json: bool,
    pub process_text: Option<PostProcess>,
}

impl CompletionRequest {
    pub fn plain(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            extract_json: false,
            process_text: None,
        }
    }
}

/// Completed answer with optional annotations from the post-process hook
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub highlight_data: Option<Value>,
    pub confidence_data: Option<Value>,
}

/// Language model provider
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, LlmError>;
}
