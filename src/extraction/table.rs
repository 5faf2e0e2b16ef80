//! Table extraction delegator
//!
//! No summarization or evaluation is performed on table results; the raw
//! extracted value is stored directly by the caller.

use serde_json::Value;

use crate::completion::LlmClient;
use crate::errors::{EngineError, Result};
use crate::plugins::{Capability, PluginRegistry};
use crate::types::TableSettings;

/// Extract a table via the table-extraction plugin
pub async fn extract_table(
    llm: &dyn LlmClient,
    plugins: &PluginRegistry,
    table_settings: &TableSettings,
    enforce_type: &str,
) -> Result<Value> {
    let extractor = plugins.table_extractor().ok_or_else(|| {
        EngineError::CapabilityUnavailable(Capability::TableExtraction.to_string())
    })?;

    extractor
        .extract(llm, table_settings, enforce_type)
        .await
        .map_err(|e| EngineError::ExecutionFailed(format!("Couldn't extract table. {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionRequest, CompletionResponse, LlmError};
    use crate::plugins::{PluginError, TableExtractor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct NoopLlm;

    #[async_trait]
    impl LlmClient for NoopLlm {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse::default())
        }
    }

    struct FixedTable(Value);

    #[async_trait]
    impl TableExtractor for FixedTable {
        async fn extract(
            &self,
            _llm: &dyn LlmClient,
            _settings: &TableSettings,
            _enforce_type: &str,
        ) -> std::result::Result<Value, PluginError> {
            Ok(self.0.clone())
        }
    }

    struct FailingTable;

    #[async_trait]
    impl TableExtractor for FailingTable {
        async fn extract(
            &self,
            _llm: &dyn LlmClient,
            _settings: &TableSettings,
            _enforce_type: &str,
        ) -> std::result::Result<Value, PluginError> {
            Err(PluginError::new("rows did not align"))
        }
    }

    #[tokio::test]
    async fn test_missing_capability() {
        let plugins = PluginRegistry::empty();
        let err = extract_table(&NoopLlm, &plugins, &TableSettings::default(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CapabilityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_raw_value_returned() {
        let table = json!([["a", "b"], ["1", "2"]]);
        let plugins = PluginRegistry::builder()
            .with_table_extractor(Arc::new(FixedTable(table.clone())))
            .build();

        let value = extract_table(&NoopLlm, &plugins, &TableSettings::default(), "json")
            .await
            .unwrap();
        assert_eq!(value, table);
    }

    #[tokio::test]
    async fn test_plugin_failure_gets_table_message() {
        let plugins = PluginRegistry::builder()
            .with_table_extractor(Arc::new(FailingTable))
            .build();

        let err = extract_table(&NoopLlm, &plugins, &TableSettings::default(), "")
            .await
            .unwrap_err();
        match err {
            EngineError::ExecutionFailed(msg) => {
                assert!(msg.contains("Couldn't extract table"));
                assert!(msg.contains("rows did not align"));
            }
            other => panic!("Expected ExecutionFailed, got {other:?}"),
        }
    }
}
