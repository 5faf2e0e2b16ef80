//! Prompt execution engine
//!
//! Wires the injected collaborators (vector index, model client, plugin
//! registry, storage provider, optional usage store) and runs a document's
//! prompts sequentially: variable substitution, retrieval per strategy,
//! prompt compilation, completion. Table and line-item prompts skip
//! retrieval/compilation and go straight to their delegator.
//!
//! `StructuredOutput` and `RunMetadata` are mutated only after a step fully
//! succeeds, so an aborted run holds no partial state needing rollback.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::completion::{run_completion, LlmClient};
use crate::errors::Result;
use crate::extraction::{extract_line_items, extract_table};
use crate::plugins::PluginRegistry;
use crate::prompt::{compile, resolve_variables};
use crate::retrieval::{ContextRetriever, RetryPolicy, SubquestionDecomposer, VectorIndex};
use crate::storage::StorageProvider;
use crate::types::{
    Context, DocumentRef, ExecutionSource, PromptSpec, PromptType, RetrievalStrategy, RunMetadata,
    StructuredOutput, ToolSettings,
};
use crate::usage::UsageStore;

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub structured_output: StructuredOutput,
    pub metadata: RunMetadata,
}

/// Retrieval-augmented prompt execution engine
///
/// All collaborators are injected; the engine reads no global state.
pub struct PromptEngine {
    retriever: ContextRetriever,
    llm: Arc<dyn LlmClient>,
    plugins: Arc<PluginRegistry>,
    storage: StorageProvider,
    usage: Option<Arc<UsageStore>>,
}

impl PromptEngine {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        plugins: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            retriever: ContextRetriever::new(index),
            llm,
            plugins,
            storage: StorageProvider::local(),
            usage: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        let index = self.retriever_index();
        self.retriever = ContextRetriever::with_retry(index, policy);
        self
    }

    pub fn with_storage(mut self, storage: StorageProvider) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_usage_store(mut self, store: Arc<UsageStore>) -> Self {
        self.usage = Some(store);
        self
    }

    fn retriever_index(&self) -> Arc<dyn VectorIndex> {
        self.retriever.index()
    }

    /// Execute all prompts of a run sequentially
    pub async fn execute_run(
        &self,
        run_id: Option<String>,
        prompts: &[PromptSpec],
        settings: &ToolSettings,
        doc: &DocumentRef,
        execution_source: ExecutionSource,
    ) -> Result<RunOutcome> {
        let run_id = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut structured_output = StructuredOutput::new();
        let mut metadata = RunMetadata::new(&run_id);

        info!(run_id = %run_id, doc_id = %doc.doc_id, prompts = prompts.len(), "Executing run");
        for spec in prompts {
            self.execute_prompt(
                spec,
                settings,
                doc,
                execution_source,
                &mut structured_output,
                &mut metadata,
            )
            .await?;
        }

        Ok(RunOutcome {
            structured_output,
            metadata,
        })
    }

    /// Execute one prompt, accumulating into the run's output and metadata
    pub async fn execute_prompt(
        &self,
        spec: &PromptSpec,
        settings: &ToolSettings,
        doc: &DocumentRef,
        execution_source: ExecutionSource,
        structured_output: &mut StructuredOutput,
        metadata: &mut RunMetadata,
    ) -> Result<()> {
        match spec.prompt_type {
            PromptType::Table => {
                let answer = extract_table(
                    self.llm.as_ref(),
                    &self.plugins,
                    &spec.table_settings,
                    &spec.enforce_type,
                )
                .await?;
                structured_output.insert(&spec.name, answer);
            }
            PromptType::LineItem => {
                let resolved =
                    resolve_variables(&spec.prompt, &spec.variables, structured_output)?;
                let mut resolved_spec = spec.clone();
                resolved_spec.prompt = resolved;
                let answer = extract_line_items(
                    self.llm.as_ref(),
                    &self.plugins,
                    settings,
                    &resolved_spec,
                    structured_output,
                    metadata,
                    &doc.file_path,
                    execution_source,
                    &self.storage,
                )
                .await?;
                structured_output.insert(&spec.name, answer);
            }
            PromptType::Text | PromptType::Json => {
                let resolved =
                    resolve_variables(&spec.prompt, &spec.variables, structured_output)?;
                let context = self.gather_context(spec, doc, &resolved).await?;

                let answer = self
                    .construct_and_run(spec, settings, doc, execution_source, &resolved, &context, metadata)
                    .await?;

                metadata.record_context(&spec.name, self.plugins.cleaned_context(&context));
                structured_output.insert(&spec.name, answer);
            }
        }
        Ok(())
    }

    /// Aggregate persisted usage for a run into its metadata (best-effort)
    pub async fn usage_metadata(&self, bearer_token: &str, metadata: RunMetadata) -> RunMetadata {
        match &self.usage {
            Some(store) => store.aggregate(bearer_token, metadata).await,
            None => metadata,
        }
    }

    async fn gather_context(
        &self,
        spec: &PromptSpec,
        doc: &DocumentRef,
        resolved_prompt: &str,
    ) -> Result<Context> {
        match spec.retrieval_strategy {
            RetrievalStrategy::None => Ok(Context::new()),
            RetrievalStrategy::Simple => {
                self.retriever
                    .fetch(doc, resolved_prompt, spec.similarity_top_k)
                    .await
            }
            RetrievalStrategy::Subquestion => {
                let decomposer = SubquestionDecomposer::new(&self.retriever);
                decomposer
                    .retrieve(self.llm.as_ref(), doc, resolved_prompt, spec.similarity_top_k)
                    .await
            }
        }
    }

    async fn construct_and_run(
        &self,
        spec: &PromptSpec,
        settings: &ToolSettings,
        doc: &DocumentRef,
        execution_source: ExecutionSource,
        resolved_prompt: &str,
        context: &Context,
        metadata: &mut RunMetadata,
    ) -> Result<serde_json::Value> {
        // The platform postamble only applies to highlighted, non-summary
        // answers
        let platform_postamble =
            if !settings.enable_highlight || settings.summarize_as_source {
                ""
            } else {
                settings.platform_postamble.as_str()
            };

        let prompt = compile(
            &settings.preamble,
            resolved_prompt,
            &settings.postamble,
            &spec.grammar,
            &context.joined(),
            platform_postamble,
        );

        let outcome = run_completion(
            self.llm.as_ref(),
            prompt,
            spec.prompt_type,
            settings.enable_highlight,
            &doc.file_path,
            execution_source,
            &self.plugins,
            &self.storage,
            Some(metadata),
            Some(&spec.name),
        )
        .await?;

        Ok(answer_value(spec.prompt_type, outcome.answer))
    }
}

/// Answers for JSON-typed prompts are parsed when the provider returned
/// valid JSON, otherwise kept verbatim
fn answer_value(prompt_type: PromptType, answer: String) -> serde_json::Value {
    if prompt_type.wants_json() {
        if let Ok(value) = serde_json::from_str(&answer) {
            return value;
        }
    }
    serde_json::Value::String(answer)
}
