//! Context retrieval against the vector index
//!
//! The retriever issues similarity queries restricted to one document and
//! absorbs index write-propagation lag with a single fixed-delay retry.
//! Sub-question mode decomposes a verbose prompt and unions per-question
//! retrievals into one deduplicated context.

pub mod qdrant;
pub mod retriever;
pub mod subquestion;

pub use retriever::{ContextRetriever, IndexError, RetryPolicy, ScoredNode, VectorIndex};
pub use subquestion::SubquestionDecomposer;
