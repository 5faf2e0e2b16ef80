//! Line-item extraction delegator
//!
//! Locates the companion extracted-text file for the document, compiles a
//! prompt over the raw text, and hands it to the line-item plugin. The
//! missing-file case fails before any model call is attempted; on success
//! the consumed raw text is archived into the run's context metadata.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::completion::LlmClient;
use crate::errors::{EngineError, Result};
use crate::plugins::{Capability, PluginRegistry};
use crate::prompt::compile;
use crate::storage::StorageProvider;
use crate::types::{ExecutionSource, PromptSpec, RunMetadata, StructuredOutput, ToolSettings};

/// Extract line items via the line-item plugin
#[allow(clippy::too_many_arguments)]
pub async fn extract_line_items(
    llm: &dyn LlmClient,
    plugins: &PluginRegistry,
    tool_settings: &ToolSettings,
    spec: &PromptSpec,
    structured_output: &StructuredOutput,
    metadata: &mut RunMetadata,
    file_path: &Path,
    execution_source: ExecutionSource,
    storage: &StorageProvider,
) -> Result<Value> {
    let extractor = plugins.line_item_extractor().ok_or_else(|| {
        EngineError::CapabilityUnavailable(Capability::LineItemExtraction.to_string())
    })?;

    let extract_path = extracted_text_path(file_path, execution_source);
    let store = storage.scope_for(execution_source);
    if !store.exists(&extract_path) {
        return Err(EngineError::SourceTextNotFound(extract_path));
    }
    let raw_text = store.read_to_string(&extract_path)?;

    let prompt = compile(
        &tool_settings.preamble,
        &spec.prompt,
        &tool_settings.postamble,
        &spec.grammar,
        &raw_text,
        "",
    );

    let answer = extractor
        .extract(llm, tool_settings, &prompt, structured_output)
        .await
        .map_err(|e| EngineError::ExecutionFailed(format!("Couldn't extract line items. {e}")))?;

    metadata.record_context(&spec.name, vec![raw_text]);
    Ok(answer)
}

/// Companion extracted-text path for a document
///
/// Interactive-authoring runs read `{dir}/extract/{stem}.txt` next to the
/// original file; automated runs receive the extracted text path directly.
pub fn extracted_text_path(file_path: &Path, execution_source: ExecutionSource) -> PathBuf {
    match execution_source {
        ExecutionSource::Ide => {
            let dir = file_path.parent().unwrap_or_else(|| Path::new(""));
            let stem = file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            dir.join("extract").join(format!("{stem}.txt"))
        }
        ExecutionSource::Tool => file_path.to_path_buf(),
    }
}
