//! Sub-question decomposition
//!
//! Asks the model to split a verbose prompt into up to ten comma-separated
//! sub-questions, retrieves context for each, and unions the results. The
//! response is split on literal commas with no escaping; a sub-question
//! containing a comma in its own text splits incorrectly. Known limitation,
//! downstream retrieval tolerates the malformed pieces.

use tracing::debug;

use crate::completion::{CompletionRequest, LlmClient};
use crate::errors::{EngineError, Result};
use crate::types::{Context, DocumentRef};

use super::ContextRetriever;

/// Decomposes complex prompts and unions per-sub-question retrievals
pub struct SubquestionDecomposer<'a> {
    retriever: &'a ContextRetriever,
}

impl<'a> SubquestionDecomposer<'a> {
    pub fn new(retriever: &'a ContextRetriever) -> Self {
        Self { retriever }
    }

    /// Ask the model to emit comma-separated sub-questions for a prompt
    pub async fn decompose(&self, llm: &dyn LlmClient, prompt_text: &str) -> Result<Vec<String>> {
        let instruction = decomposition_instruction(prompt_text);
        let response = llm
            .complete(CompletionRequest::plain(instruction))
            .await
            .map_err(|e| match e {
                crate::completion::LlmError::RateLimit(msg) => EngineError::RateLimited(msg),
                crate::completion::LlmError::Provider(msg) => EngineError::ExecutionFailed(msg),
            })?;

        let subquestions: Vec<String> = response
            .text
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        debug!(count = subquestions.len(), "Decomposed prompt into subquestions");
        Ok(subquestions)
    }

    /// Decompose, retrieve per sub-question, and union into one context
    pub async fn retrieve(
        &self,
        llm: &dyn LlmClient,
        doc: &DocumentRef,
        prompt_text: &str,
        similarity_top_k: usize,
    ) -> Result<Context> {
        let subquestions = self.decompose(llm, prompt_text).await?;

        let mut context = Context::new();
        for subquestion in &subquestions {
            let retrieved = self
                .retriever
                .retrieve(doc, subquestion, similarity_top_k)
                .await?;
            context.union(retrieved);
        }
        Ok(context)
    }
}

fn decomposition_instruction(prompt: &str) -> String {
    format!(
        "I am sending you a verbose prompt \n \n Prompt : {prompt} \n \n\
         Generate a set of specific subquestions from the prompt which can be \
         used to retrieve relevant context from a vector db. \
         Only generate as many subquestions as necessary, fewer if the prompt \
         is simpler, and set the maximum limit for the subquestions to 10. \
         Ensure that each subquestion is distinct, relevant to the original \
         query, and targets a distinct aspect of it. \
         Do not add subquestions for details not mentioned in the original \
         prompt. \
         If the response is expected to be a list of answers, the \
         subquestions must not miss out any values. \
         The goal is to maximize retrieval accuracy using these subquestions. \
         Output should be a list of comma separated subquestion prompts. \
         Do not change this format. \n \n Subquestions : "
    )
}
