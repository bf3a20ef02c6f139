//! Evidence retrieval for the Petri pipeline.
//!
//! One [`Retriever`] call fans a query out across every enabled live source
//! in parallel, answers repeat queries from a TTL cache, and falls back to a
//! local vector index when the live sources produce nothing. Results come
//! back deduplicated by `(source, id)` and sorted by descending score.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`EvidenceCache`] | TTL cache keyed by `(source, normalized query)` |
//! | [`SourceRegistry`] | Connectors for the enabled sources; disabled ones are never constructed |
//! | [`VectorIndex`] over a [`CorpusStore`] | Local cosine fallback for outages |
//! | [`Retriever`] | Fan-out, merge, dedup, rank, truncate |
//!
//! # Example
//!
//! ```rust
//! use petri_connectors::MockConnector;
//! use petri_core::config::PipelineConfig;
//! use petri_core::types::Source;
//! use petri_retrieval::{Retriever, SourceRegistry};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = SourceRegistry::new().with_connector(Arc::new(
//!     MockConnector::new(Source::Pubmed).with_passages(&[("101", "BRCA1 repairs DNA.")]),
//! ));
//! let retriever = Retriever::new(PipelineConfig::default(), registry);
//!
//! let result = retriever.retrieve("BRCA1 repair").await.unwrap();
//! assert_eq!(result.items.len(), 1);
//! assert!(!result.degraded);
//! # }
//! ```

pub mod cache;
pub mod corpus;
pub mod index;
pub mod registry;
pub mod retriever;
#[cfg(feature = "sqlite")]
pub mod sqlite_corpus;

use thiserror::Error;

/// Failures the retrieval layer can surface to the pipeline.
///
/// Connector failures never appear here: the retriever absorbs them into the
/// degraded flag and warnings of the result.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The query was empty or whitespace. Raised before any I/O happens.
    #[error("Query is empty")]
    InvalidQuery,

    #[error("Corpus load failed: {0}")]
    CorpusLoad(String),

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Index unavailable: {0}")]
    Index(String),
}

/// Result type for retrieval operations.
pub type RetrieveResult<T> = Result<T, RetrievalError>;

pub use cache::{Clock, EvidenceCache, ManualClock, SystemClock};
pub use corpus::{CorpusDocument, CorpusStore, JsonlCorpus};
pub use index::VectorIndex;
pub use registry::SourceRegistry;
pub use retriever::{merge_ranked, RetrievalStats, Retriever};
#[cfg(feature = "sqlite")]
pub use sqlite_corpus::SqliteCorpus;
