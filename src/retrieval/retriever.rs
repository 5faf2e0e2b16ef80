//! Context retriever with consistency-lag retry
//!
//! Some vector DB providers confirm writes before queries can see them, so
//! a query issued right after indexing can come back empty even though the
//! chunks exist. The retriever waits a fixed delay and retries exactly once
//! before declaring failure; the delay and retry count are configurable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::{EngineError, Result};
use crate::types::{Context, DocumentRef};

/// Error reported by a vector index backend
#[derive(Error, Debug)]
#[error("{message}")]
pub struct IndexError {
    pub message: String,
    pub status: Option<u16>,
}

impl IndexError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// Ranked node returned by a similarity query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredNode {
    pub id: String,
    pub score: f32,
    pub content: String,
}

/// Vector index queried for a document's chunks
///
/// Implementations issue a similarity query restricted to the given
/// document id and return ranked nodes with relevance scores.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(
        &self,
        doc: &DocumentRef,
        query: &str,
        top_k: usize,
    ) -> std::result::Result<Vec<ScoredNode>, IndexError>;
}

/// Retry behavior for an empty first retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Fixed delay before the retry
    pub delay: Duration,
    /// Number of retries after the first attempt
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Tuned for observed vector DB write-propagation lag
        Self {
            delay: Duration::from_secs(2),
            max_retries: 1,
        }
    }
}

/// Retrieves context for a document/prompt pair from the vector index
pub struct ContextRetriever {
    index: Arc<dyn VectorIndex>,
    retry: RetryPolicy,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(index: Arc<dyn VectorIndex>, retry: RetryPolicy) -> Self {
        Self { index, retry }
    }

    /// Fetch context for a prompt, retrying once on an empty result
    ///
    /// Fails with [`EngineError::RetrievalFailure`] naming the vector-store
    /// id and document id if the index stays empty after the retry. Backend
    /// errors are wrapped with the original message and status preserved.
    pub async fn fetch(
        &self,
        doc: &DocumentRef,
        prompt_text: &str,
        similarity_top_k: usize,
    ) -> Result<Context> {
        let mut context = self.retrieve(doc, prompt_text, similarity_top_k).await?;

        let mut retries_left = self.retry.max_retries;
        while context.is_empty() && retries_left > 0 {
            warn!(
                doc_id = %doc.doc_id,
                delay_ms = self.retry.delay.as_millis() as u64,
                "Empty retrieval, waiting for index writes to settle"
            );
            tokio::time::sleep(self.retry.delay).await;
            context = self.retrieve(doc, prompt_text, similarity_top_k).await?;
            retries_left -= 1;
        }

        if context.is_empty() {
            return Err(EngineError::RetrievalFailure {
                vector_db: doc.vector_db_instance_id.clone(),
                doc_id: doc.doc_id.clone(),
            });
        }

        info!(doc_id = %doc.doc_id, snippets = context.len(), "Fetched context from vector DB");
        Ok(context)
    }

    /// Single similarity query with no retry, used per sub-question
    ///
    /// Nodes with relevance score <= 0 are excluded; nodes with score > 0
    /// contribute their text content.
    pub async fn retrieve(
        &self,
        doc: &DocumentRef,
        query: &str,
        top_k: usize,
    ) -> Result<Context> {
        let nodes = self
            .index
            .search(doc, query, top_k)
            .await
            .map_err(|e| EngineError::RetrievalError {
                vector_db: doc.vector_db_instance_id.clone(),
                doc_id: doc.doc_id.clone(),
                message: e.message,
                status: e.status,
            })?;

        let mut context = Context::new();
        for node in nodes {
            if node.score > 0.0 {
                context.insert(node.content);
            } else {
                debug!(node_id = %node.id, score = node.score, "Ignored node with non-positive score");
            }
        }
        Ok(context)
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn index(&self) -> Arc<dyn VectorIndex> {
        Arc::clone(&self.index)
    }
}
