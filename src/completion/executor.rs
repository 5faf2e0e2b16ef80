//! Completion executor
//!
//! Wraps one model call: installs the highlighting hook when enabled and
//! available, asks for JSON when the prompt type is not plain text,
//! classifies provider errors, and records highlight/confidence data into
//! run metadata keyed by the prompt's name.

use std::path::Path;

use tracing::error;

use crate::errors::{EngineError, Result};
use crate::plugins::PluginRegistry;
use crate::storage::StorageProvider;
use crate::types::{ExecutionSource, PromptType, RunMetadata};

use super::{CompletionRequest, LlmClient, LlmError};

/// Answer plus the annotations that were recorded for it
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub answer: String,
    pub highlight_data: Option<serde_json::Value>,
    pub confidence_data: Option<serde_json::Value>,
}

/// Execute one completion against the model
///
/// `prompt_key` scopes the metadata side effects; when `None`, nothing is
/// recorded (sub-question decomposition runs this way).
#[allow(clippy::too_many_arguments)]
pub async fn run_completion(
    llm: &dyn LlmClient,
    prompt: String,
    prompt_type: PromptType,
    enable_highlight: bool,
    file_path: &Path,
    execution_source: ExecutionSource,
    plugins: &PluginRegistry,
    storage: &StorageProvider,
    metadata: Option<&mut RunMetadata>,
    prompt_key: Option<&str>,
) -> Result<CompletionOutcome> {
    let process_text = if enable_highlight {
        plugins.highlighter().map(|highlighter| {
            let store = storage.scope_for(execution_source);
            highlighter.build_hook(file_path, store)
        })
    } else {
        None
    };

    let request = CompletionRequest {
        prompt,
        extract_json: prompt_type.wants_json(),
        process_text,
    };

    let response = llm.complete(request).await.map_err(|e| match e {
        LlmError::RateLimit(msg) => EngineError::RateLimited(msg),
        LlmError::Provider(msg) => {
            error!(error = %msg, "Error fetching response for prompt");
            EngineError::ExecutionFailed(msg)
        }
    })?;

    if let (Some(metadata), Some(key)) = (metadata, prompt_key) {
        if let Some(ref highlight) = response.highlight_data {
            metadata.record_highlight(key, highlight.clone());
        }
        if let Some(ref confidence) = response.confidence_data {
            metadata.record_confidence(key, confidence.clone());
        }
    }

    Ok(CompletionOutcome {
        answer: response.text,
        highlight_data: response.highlight_data,
        confidence_data: response.confidence_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionResponse, ProcessedText};
    use crate::plugins::{Highlighter, PluginRegistry};
    use crate::storage::FileStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct CannedLlm {
        result: std::result::Result<CompletionResponse, LlmError>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, LlmError> {
            match &self.result {
                Ok(response) => {
                    let mut response = response.clone();
                    if let Some(hook) = request.process_text {
                        let processed = hook(&response.text);
                        response.highlight_data = processed.highlight_data;
                        response.confidence_data = processed.confidence_data;
                    }
                    Ok(response)
                }
                Err(LlmError::RateLimit(msg)) => Err(LlmError::RateLimit(msg.clone())),
                Err(LlmError::Provider(msg)) => Err(LlmError::Provider(msg.clone())),
            }
        }
    }

    struct SpanHighlighter;

    impl Highlighter for SpanHighlighter {
        fn build_hook(
            &self,
            _file_path: &Path,
            _store: Arc<dyn FileStore>,
        ) -> crate::completion::PostProcess {
            Arc::new(|answer: &str| ProcessedText {
                highlight_data: Some(json!([[0, answer.len()]])),
                confidence_data: Some(json!(0.87)),
            })
        }
    }

    fn canned(text: &str) -> CannedLlm {
        CannedLlm {
            result: Ok(CompletionResponse {
                text: text.to_string(),
                highlight_data: None,
                confidence_data: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_records_highlight_and_confidence() {
        let llm = canned("the answer");
        let plugins = PluginRegistry::builder()
            .with_highlighter(Arc::new(SpanHighlighter))
            .build();
        let storage = StorageProvider::local();
        let mut metadata = RunMetadata::new("run-1");

        let outcome = run_completion(
            &llm,
            "prompt".to_string(),
            PromptType::Text,
            true,
            &PathBuf::from("/tmp/file.pdf"),
            ExecutionSource::Ide,
            &plugins,
            &storage,
            Some(&mut metadata),
            Some("invoice_number"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.answer, "the answer");
        assert!(metadata.highlight_data.contains_key("invoice_number"));
        assert_eq!(metadata.confidence_data["invoice_number"], json!(0.87));
    }

    #[tokio::test]
    async fn test_skips_metadata_without_prompt_key() {
        let llm = canned("subquestions a, b");
        let plugins = PluginRegistry::builder().build();
        let storage = StorageProvider::local();
        let mut metadata = RunMetadata::new("run-1");

        run_completion(
            &llm,
            "prompt".to_string(),
            PromptType::Text,
            false,
            &PathBuf::new(),
            ExecutionSource::Tool,
            &plugins,
            &storage,
            Some(&mut metadata),
            None,
        )
        .await
        .unwrap();

        assert!(metadata.highlight_data.is_empty());
        assert!(metadata.confidence_data.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_classified_distinctly() {
        let llm = CannedLlm {
            result: Err(LlmError::RateLimit("429 from provider".to_string())),
        };
        let plugins = PluginRegistry::builder().build();
        let storage = StorageProvider::local();

        let err = run_completion(
            &llm,
            "prompt".to_string(),
            PromptType::Text,
            false,
            &PathBuf::new(),
            ExecutionSource::Tool,
            &plugins,
            &storage,
            None,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_carries_message() {
        let llm = CannedLlm {
            result: Err(LlmError::Provider("model exploded".to_string())),
        };
        let plugins = PluginRegistry::builder().build();
        let storage = StorageProvider::local();

        let err = run_completion(
            &llm,
            "prompt".to_string(),
            PromptType::Json,
            false,
            &PathBuf::new(),
            ExecutionSource::Tool,
            &plugins,
            &storage,
            None,
            None,
        )
        .await
        .unwrap_err();

        match err {
            EngineError::ExecutionFailed(msg) => assert_eq!(msg, "model exploded"),
            other => panic!("Expected ExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_highlight_disabled_installs_no_hook() {
        let llm = canned("plain");
        let plugins = PluginRegistry::builder()
            .with_highlighter(Arc::new(SpanHighlighter))
            .build();
        let storage = StorageProvider::local();
        let mut metadata = RunMetadata::new("run-1");

        let outcome = run_completion(
            &llm,
            "prompt".to_string(),
            PromptType::Text,
            false,
            &PathBuf::new(),
            ExecutionSource::Ide,
            &plugins,
            &storage,
            Some(&mut metadata),
            Some("q"),
        )
        .await
        .unwrap();

        assert!(outcome.highlight_data.is_none());
        assert!(metadata.highlight_data.is_empty());
    }
}
