//! Error types for the prompt execution engine
//!
//! Each failure mode a caller can act on gets its own variant: retrieval
//! that stayed empty, provider throttling, missing prompt variables,
//! uninstalled plugin capabilities, and a missing extracted-text file.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the prompt execution engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Context remained empty after the configured retry
    #[error(
        "Couldn't fetch context from vector DB {vector_db} for doc_id {doc_id}. \
         This happens usually due to a delay by the vector DB provider to \
         confirm writes. Please try again after some time"
    )]
    RetrievalFailure { vector_db: String, doc_id: String },

    /// Vector index transport or backend failure
    #[error("Unable to fetch context from vector DB {vector_db} for doc_id {doc_id}: {message}")]
    RetrievalError {
        vector_db: String,
        doc_id: String,
        message: String,
        status: Option<u16>,
    },

    /// Model provider throttling, retryable by the caller
    #[error("Rate limit error. {0}")]
    RateLimited(String),

    /// Generic model-provider or plugin failure
    #[error("{0}")]
    ExecutionFailed(String),

    /// Prompt template references an answer that was never produced
    #[error("Variable {0} not found in structured output")]
    MissingVariable(String),

    /// Requested plugin capability is not installed for this deployment
    #[error(
        "The {0} capability is a cloud / enterprise feature. If you have \
         purchased a plan and still face this issue, please contact support"
    )]
    CapabilityUnavailable(String),

    /// Companion extracted-text file for line-item extraction is missing
    #[error("The file at path '{0}' does not exist")]
    SourceTextNotFound(PathBuf),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Usage store errors (absorbed by the aggregator, surfaced elsewhere)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::ExecutionFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_failure_names_store_and_doc() {
        let err = EngineError::RetrievalFailure {
            vector_db: "qdrant-main".to_string(),
            doc_id: "doc-42".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("qdrant-main"));
        assert!(msg.contains("doc-42"));
    }

    #[test]
    fn test_missing_variable_display() {
        let err = EngineError::MissingVariable("invoice_number".to_string());
        assert!(err.to_string().contains("invoice_number"));
    }

    #[test]
    fn test_capability_unavailable_reads_as_licensing() {
        let err = EngineError::CapabilityUnavailable("line-item-extraction".to_string());
        assert!(err.to_string().contains("enterprise feature"));
    }
}
