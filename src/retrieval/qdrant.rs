//! Qdrant-backed vector index
//!
//! Implements [`VectorIndex`] over a Qdrant collection with an exact-match
//! `doc_id` payload filter. Query embeddings are produced by an injected
//! [`Embedder`]; an Ollama embeddings client is provided.

use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        with_payload_selector::SelectorOptions, Condition, FieldCondition, Filter, Match,
        SearchPoints, WithPayloadSelector,
    },
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::types::DocumentRef;

use super::{IndexError, ScoredNode, VectorIndex};

/// Produces a query embedding for retrieval
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, IndexError>;
}

/// Ollama embeddings endpoint client
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(base_url: Option<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, IndexError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(|e| IndexError::new(format!("Failed to connect to Ollama: {e}")))?;

        if !response.status().is_success() {
            return Err(IndexError::with_status(
                format!("Ollama embeddings error: {}", response.status()),
                response.status().as_u16(),
            ));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| IndexError::new(format!("Failed to parse embedding response: {e}")))?;
        Ok(parsed.embedding)
    }
}

/// Vector index over a Qdrant collection
///
/// The collection is named after the document's vector-store configuration
/// id; chunk text lives under the `document` payload key and the owning
/// document under `doc_id`.
pub struct QdrantVectorIndex {
    client: QdrantClient,
    embedder: Arc<dyn Embedder>,
}

impl QdrantVectorIndex {
    pub fn new(url: &str, embedder: Arc<dyn Embedder>) -> std::result::Result<Self, IndexError> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| IndexError::new(format!("Failed to create Qdrant client: {e}")))?;
        Ok(Self { client, embedder })
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn search(
        &self,
        doc: &DocumentRef,
        query: &str,
        top_k: usize,
    ) -> std::result::Result<Vec<ScoredNode>, IndexError> {
        let embedding = self.embedder.embed(query).await?;

        let filter = Filter {
            must: vec![Condition {
                condition_one_of: Some(
                    qdrant_client::qdrant::condition::ConditionOneOf::Field(FieldCondition {
                        key: "doc_id".to_string(),
                        r#match: Some(Match {
                            match_value: Some(
                                qdrant_client::qdrant::r#match::MatchValue::Keyword(
                                    doc.doc_id.clone(),
                                ),
                            ),
                        }),
                        ..Default::default()
                    }),
                ),
            }],
            ..Default::default()
        };

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: doc.vector_db_instance_id.clone(),
                vector: embedding,
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                filter: Some(filter),
                ..Default::default()
            })
            .await
            .map_err(|e| IndexError::new(format!("Qdrant search failed: {e}")))?;

        let nodes = search_result
            .result
            .into_iter()
            .map(|point| {
                let content = point
                    .payload
                    .get("document")
                    .and_then(|v| match v.kind.as_ref() {
                        Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => {
                            Some(s.clone())
                        }
                        _ => None,
                    })
                    .unwrap_or_default();

                ScoredNode {
                    id: point_id_to_string(&point.id),
                    score: point.score,
                    content,
                }
            })
            .collect();

        Ok(nodes)
    }
}

fn point_id_to_string(point_id: &Option<qdrant_client::qdrant::PointId>) -> String {
    point_id
        .as_ref()
        .map(|id| {
            use qdrant_client::qdrant::point_id::PointIdOptions;
            match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => n.to_string(),
                Some(PointIdOptions::Uuid(u)) => u.clone(),
                None => "unknown".to_string(),
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}
