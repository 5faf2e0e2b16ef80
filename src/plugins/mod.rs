//! Plugin registry for optional capabilities
//!
//! Table extraction, line-item extraction, context cleaning, and answer
//! highlighting ship as separately installed plugins. The registry is
//! populated once at process start and read-only thereafter; an absent
//! capability is a first-class outcome meaning the feature is not
//! licensed/installed for this deployment, never a defect.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::completion::{LlmClient, PostProcess};
use crate::storage::FileStore;
use crate::types::{Context, StructuredOutput, TableSettings, ToolSettings};

/// Closed set of plugin capability identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    TableExtraction,
    LineItemExtraction,
    ContextCleaning,
    Highlighting,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::TableExtraction => "table-extraction",
            Capability::LineItemExtraction => "line-item-extraction",
            Capability::ContextCleaning => "clean-context",
            Capability::Highlighting => "highlight-data",
        };
        f.write_str(name)
    }
}

/// Failure reported by a plugin implementation
#[derive(Error, Debug)]
#[error("{message}")]
pub struct PluginError {
    pub message: String,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Extracts a table from the document using its own strategy
#[async_trait]
pub trait TableExtractor: Send + Sync {
    async fn extract(
        &self,
        llm: &dyn LlmClient,
        settings: &TableSettings,
        enforce_type: &str,
    ) -> std::result::Result<Value, PluginError>;
}

/// Extracts line items from raw document text
#[async_trait]
pub trait LineItemExtractor: Send + Sync {
    async fn extract(
        &self,
        llm: &dyn LlmClient,
        settings: &ToolSettings,
        prompt: &str,
        structured_output: &StructuredOutput,
    ) -> std::result::Result<Value, PluginError>;
}

/// Cleans retrieved context before it is archived
pub trait ContextCleaner: Send + Sync {
    fn clean(&self, context: &Context) -> Vec<String>;
}

/// Builds the post-processing hook that annotates answer spans
pub trait Highlighter: Send + Sync {
    fn build_hook(&self, file_path: &Path, store: Arc<dyn FileStore>) -> PostProcess;
}

/// Immutable capability lookup, built once at startup
#[derive(Default)]
pub struct PluginRegistry {
    table_extractor: Option<Arc<dyn TableExtractor>>,
    line_item_extractor: Option<Arc<dyn LineItemExtractor>>,
    context_cleaner: Option<Arc<dyn ContextCleaner>>,
    highlighter: Option<Arc<dyn Highlighter>>,
}

impl PluginRegistry {
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::default()
    }

    /// Registry with no capabilities installed
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn table_extractor(&self) -> Option<&Arc<dyn TableExtractor>> {
        self.table_extractor.as_ref()
    }

    pub fn line_item_extractor(&self) -> Option<&Arc<dyn LineItemExtractor>> {
        self.line_item_extractor.as_ref()
    }

    pub fn context_cleaner(&self) -> Option<&Arc<dyn ContextCleaner>> {
        self.context_cleaner.as_ref()
    }

    pub fn highlighter(&self) -> Option<&Arc<dyn Highlighter>> {
        self.highlighter.as_ref()
    }

    /// Whether a capability is installed
    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::TableExtraction => self.table_extractor.is_some(),
            Capability::LineItemExtraction => self.line_item_extractor.is_some(),
            Capability::ContextCleaning => self.context_cleaner.is_some(),
            Capability::Highlighting => self.highlighter.is_some(),
        }
    }

    /// Pass context through the cleaning plugin when installed,
    /// otherwise return the raw deduplicated snippets
    pub fn cleaned_context(&self, context: &Context) -> Vec<String> {
        match &self.context_cleaner {
            Some(cleaner) => cleaner.clean(context),
            None => context.to_vec(),
        }
    }
}

/// Builder for [`PluginRegistry`]; the result is treated as read-only
#[derive(Default)]
pub struct PluginRegistryBuilder {
    registry: PluginRegistry,
}

impl PluginRegistryBuilder {
    pub fn with_table_extractor(mut self, plugin: Arc<dyn TableExtractor>) -> Self {
        self.registry.table_extractor = Some(plugin);
        self
    }

    pub fn with_line_item_extractor(mut self, plugin: Arc<dyn LineItemExtractor>) -> Self {
        self.registry.line_item_extractor = Some(plugin);
        self
    }

    pub fn with_context_cleaner(mut self, plugin: Arc<dyn ContextCleaner>) -> Self {
        self.registry.context_cleaner = Some(plugin);
        self
    }

    pub fn with_highlighter(mut self, plugin: Arc<dyn Highlighter>) -> Self {
        self.registry.highlighter = Some(plugin);
        self
    }

    pub fn build(self) -> PluginRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseCleaner;

    impl ContextCleaner for UppercaseCleaner {
        fn clean(&self, context: &Context) -> Vec<String> {
            context.iter().map(|s| s.to_uppercase()).collect()
        }
    }

    #[test]
    fn test_empty_registry_has_no_capabilities() {
        let registry = PluginRegistry::empty();
        assert!(!registry.contains(Capability::TableExtraction));
        assert!(!registry.contains(Capability::LineItemExtraction));
        assert!(!registry.contains(Capability::ContextCleaning));
        assert!(!registry.contains(Capability::Highlighting));
        assert!(registry.table_extractor().is_none());
    }

    #[test]
    fn test_builder_registers_capability() {
        let registry = PluginRegistry::builder()
            .with_context_cleaner(Arc::new(UppercaseCleaner))
            .build();
        assert!(registry.contains(Capability::ContextCleaning));
        assert!(!registry.contains(Capability::TableExtraction));
    }

    #[test]
    fn test_cleaned_context_uses_plugin() {
        let registry = PluginRegistry::builder()
            .with_context_cleaner(Arc::new(UppercaseCleaner))
            .build();
        let mut context = Context::new();
        context.insert("snippet");
        assert_eq!(registry.cleaned_context(&context), vec!["SNIPPET"]);
    }

    #[test]
    fn test_cleaned_context_without_plugin_passes_through() {
        let registry = PluginRegistry::empty();
        let mut context = Context::new();
        context.insert("snippet");
        assert_eq!(registry.cleaned_context(&context), vec!["snippet"]);
    }

    #[test]
    fn test_capability_display_names() {
        assert_eq!(Capability::TableExtraction.to_string(), "table-extraction");
        assert_eq!(
            Capability::LineItemExtraction.to_string(),
            "line-item-extraction"
        );
    }
}
