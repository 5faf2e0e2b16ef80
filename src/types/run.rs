//! Run-scoped accumulators
//!
//! `StructuredOutput` maps prompt names to produced answers and feeds
//! variable substitution for later prompts. `RunMetadata` carries highlight
//! spans, confidence scores, archived context, and aggregated usage for the
//! run; it starts empty and is only ever merged into.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Mapping from prompt name to produced answer, accumulated across a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredOutput {
    answers: HashMap<String, Value>,
}

impl StructuredOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer; each prompt name is written once per run
    pub fn insert(&mut self, name: impl Into<String>, answer: Value) {
        self.answers.insert(name.into(), answer);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.answers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.answers.contains_key(name)
    }

    /// String form of an answer, as substituted into later prompts.
    /// Plain strings substitute bare, other shapes as compact JSON.
    pub fn substitution_value(&self, name: &str) -> Option<String> {
        self.answers.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// One aggregated usage group for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageItem {
    pub model_name: String,
    /// Cost formatted to fixed precision, trailing zeros trimmed
    pub cost_in_dollars: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_tokens: Option<i64>,
}

/// Per-run metadata: highlight spans, confidence scores, archived context,
/// and usage totals, all keyed by prompt name except usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    /// Highlight spans per prompt name
    #[serde(default)]
    pub highlight_data: HashMap<String, Value>,
    /// Confidence scores per prompt name
    #[serde(default)]
    pub confidence_data: HashMap<String, Value>,
    /// Context snippets consumed per prompt name
    #[serde(default)]
    pub context: HashMap<String, Vec<String>>,
    /// Aggregated usage keyed by usage classification
    #[serde(default)]
    pub usage: HashMap<String, Vec<UsageItem>>,
}

impl RunMetadata {
    /// Create empty metadata for a run
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            highlight_data: HashMap::new(),
            confidence_data: HashMap::new(),
            context: HashMap::new(),
            usage: HashMap::new(),
        }
    }

    /// Record highlight spans for a prompt
    pub fn record_highlight(&mut self, prompt_name: &str, data: Value) {
        self.highlight_data.insert(prompt_name.to_string(), data);
    }

    /// Record confidence scores for a prompt
    pub fn record_confidence(&mut self, prompt_name: &str, data: Value) {
        self.confidence_data.insert(prompt_name.to_string(), data);
    }

    /// Archive the context consumed by a prompt
    pub fn record_context(&mut self, prompt_name: &str, snippets: Vec<String>) {
        self.context.insert(prompt_name.to_string(), snippets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitution_value_plain_string() {
        let mut output = StructuredOutput::new();
        output.insert("invoice_number", json!("123"));
        assert_eq!(output.substitution_value("invoice_number").unwrap(), "123");
    }

    #[test]
    fn test_substitution_value_structured() {
        let mut output = StructuredOutput::new();
        output.insert("totals", json!({"net": 10}));
        assert_eq!(
            output.substitution_value("totals").unwrap(),
            r#"{"net":10}"#
        );
    }

    #[test]
    fn test_substitution_value_missing() {
        let output = StructuredOutput::new();
        assert!(output.substitution_value("absent").is_none());
    }

    #[test]
    fn test_metadata_starts_empty() {
        let metadata = RunMetadata::new("run-1");
        assert!(metadata.highlight_data.is_empty());
        assert!(metadata.confidence_data.is_empty());
        assert!(metadata.usage.is_empty());
    }

    #[test]
    fn test_metadata_merge_only() {
        let mut metadata = RunMetadata::new("run-1");
        metadata.record_highlight("a", json!([1, 2]));
        metadata.record_highlight("b", json!([3]));
        metadata.record_confidence("a", json!(0.9));
        assert_eq!(metadata.highlight_data.len(), 2);
        assert_eq!(metadata.confidence_data.len(), 1);
    }
}
