//! # Promptloom
//!
//! Retrieval-augmented prompt execution engine for document processing.
//! Each run takes a list of prompt definitions and one ingested document,
//! retrieves relevant context from a vector index, compiles the final
//! prompt, and executes it against a language model, accumulating answers
//! and per-prompt metadata as it goes.
//!
//! The engine is assembled from injected seams so every collaborator can be
//! swapped in tests: [`retrieval::VectorIndex`] for similarity search,
//! [`completion::LlmClient`] for the model provider, [`plugins`] for the
//! optional capabilities (table extraction, line items, context cleaning,
//! highlighting), [`storage`] for file access, and [`usage::UsageStore`]
//! for cost aggregation.

pub mod completion;
pub mod config;
pub mod engine;
pub mod errors;
pub mod extraction;
pub mod plugins;
pub mod prompt;
pub mod retrieval;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod usage;

pub use engine::{PromptEngine, RunOutcome};
pub use errors::{EngineError, Result};
pub use types::{
    DocumentRef, ExecutionSource, PromptSpec, PromptType, RetrievalStrategy, RunMetadata,
    StructuredOutput, ToolSettings,
};
