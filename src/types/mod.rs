//! Core input types for a document-processing run
//!
//! `PromptSpec` and `ToolSettings` are immutable inputs; everything the
//! engine produces lives in [`run::StructuredOutput`] and
//! [`run::RunMetadata`].

pub mod context;
pub mod run;

pub use context::Context;
pub use run::{RunMetadata, StructuredOutput, UsageItem};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of answer a prompt expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptType {
    /// Free-form text answer
    Text,
    /// Structured (JSON) answer
    Json,
    /// Table extracted by the table-extraction plugin
    Table,
    /// Line items extracted by the line-item plugin
    LineItem,
}

impl PromptType {
    /// Whether the model should be asked to return JSON
    pub fn wants_json(&self) -> bool {
        !matches!(self, PromptType::Text)
    }
}

/// How context is gathered for a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    /// No retrieval, compile with an empty context block
    None,
    /// Single similarity query against the document's chunks
    Simple,
    /// Decompose into sub-questions and union their retrievals
    Subquestion,
}

/// Word / synonym-list pair telling the model two terms are equivalent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarEntry {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Opaque settings handed to the table-extraction plugin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSettings {
    #[serde(flatten)]
    pub values: HashMap<String, serde_json::Value>,
}

/// One question definition, immutable input to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Unique key within a run
    pub name: String,
    /// Resolved prompt text (may contain `%variable%` markers)
    pub prompt: String,
    pub prompt_type: PromptType,
    pub retrieval_strategy: RetrievalStrategy,
    /// Number of nearest chunks to retrieve
    pub similarity_top_k: usize,
    /// Variable names eligible for `%name%` substitution
    #[serde(default)]
    pub variables: Vec<String>,
    /// Ordered grammar entries appended to the compiled prompt
    #[serde(default)]
    pub grammar: Vec<GrammarEntry>,
    #[serde(default)]
    pub table_settings: TableSettings,
    /// Type enforcement hint passed to the table-extraction plugin
    #[serde(default)]
    pub enforce_type: String,
}

impl PromptSpec {
    /// Minimal spec for a free-text prompt with simple retrieval
    pub fn text(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            prompt_type: PromptType::Text,
            retrieval_strategy: RetrievalStrategy::Simple,
            similarity_top_k: 3,
            variables: Vec::new(),
            grammar: Vec::new(),
            table_settings: TableSettings::default(),
            enforce_type: String::new(),
        }
    }
}

/// Settings shared across all prompts in a run, immutable input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default)]
    pub preamble: String,
    #[serde(default)]
    pub postamble: String,
    /// Appended instruction block shown only when highlighting applies
    #[serde(default)]
    pub platform_postamble: String,
    #[serde(default)]
    pub summarize_as_source: bool,
    #[serde(default)]
    pub enable_highlight: bool,
}

/// Where a run originates; determines storage scope selection only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionSource {
    /// Interactive authoring (prompt studio)
    Ide,
    /// Automated tool run
    Tool,
}

/// Identifies one ingested document and the index configuration scoping it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Identifier scoping retrieval to one document's indexed chunks
    pub doc_id: String,
    /// Embedding configuration id used at indexing time
    pub embedding_instance_id: String,
    /// Vector-store configuration id, reported in retrieval errors
    pub vector_db_instance_id: String,
    /// Path to the original file, used by extraction delegators
    #[serde(default)]
    pub file_path: std::path::PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_type_wants_json() {
        assert!(!PromptType::Text.wants_json());
        assert!(PromptType::Json.wants_json());
        assert!(PromptType::Table.wants_json());
        assert!(PromptType::LineItem.wants_json());
    }

    #[test]
    fn test_text_spec_defaults() {
        let spec = PromptSpec::text("invoice_number", "What is the invoice number?");
        assert_eq!(spec.name, "invoice_number");
        assert_eq!(spec.retrieval_strategy, RetrievalStrategy::Simple);
        assert_eq!(spec.similarity_top_k, 3);
        assert!(spec.grammar.is_empty());
    }

    #[test]
    fn test_tool_settings_deserialize_defaults() {
        let settings: ToolSettings = serde_json::from_str("{}").unwrap();
        assert!(!settings.enable_highlight);
        assert!(!settings.summarize_as_source);
        assert!(settings.preamble.is_empty());
    }
}
