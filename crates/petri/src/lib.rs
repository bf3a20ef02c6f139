//! # Petri
//!
//! Biomedical evidence retrieval and hypothesis confidence pipeline.
//!
//! Petri answers a biomedical question by fanning the query out across
//! heterogeneous sources (PubMed, UniProt, DrugBank, caller uploads, a local
//! vector fallback), letting domain agents read the evidence, synthesizing a
//! citation-bearing hypothesis, and scoring it on Evidence, Consistency, and
//! Novelty.
//!
//! ## Quick Start
//!
//! ```rust
//! use petri::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! // Offline setup: a mock connector stands in for PubMed.
//! let registry = SourceRegistry::new().with_connector(Arc::new(
//!     MockConnector::new(Source::Pubmed).with_passages(&[(
//!         "31452104",
//!         "Amyloid beta aggregation disrupts synaptic protein signaling.",
//!     )]),
//! ));
//!
//! let config = PipelineConfig::default();
//! let coordinator = Coordinator::new(config.clone(), Retriever::new(config, registry));
//!
//! let result = coordinator.run_pipeline("amyloid beta aggregation").await.unwrap();
//!
//! println!("{:.1}% — {}", result.confidence.overall_percentage, result.text);
//! assert!(result.citations.contains_key("31452104"));
//! # });
//! ```
//!
//! ## Architecture
//!
//! Petri is organized into several crates:
//!
//! - [`petri_core`] - Shared types, text utilities, pipeline configuration
//! - [`petri_model`] - Embedding and generation traits plus offline backends
//! - [`petri_connectors`] - Live source adapters behind one capability trait
//! - [`petri_retrieval`] - TTL cache, source registry, vector fallback, retriever
//! - [`petri_agents`] - Domain agents, context selection, hypothesis synthesis
//! - [`petri_pipeline`] - Coordinator state machine and confidence scoring
//!
//! ## Pipeline States
//!
//! Every run walks a fixed path; degraded retrieval stays on it, fatal errors
//! leave it:
//!
//! ```text
//! Idle -> Retrieving -> Analyzing -> Synthesizing -> Scoring -> Done
//!                \--------------------\----------------\-----> Failed
//! ```
//!
//! ## Confidence
//!
//! | Component   | Weight | Measures |
//! |-------------|--------|----------|
//! | Evidence    | 40%    | Volume and quality of trusted supporting passages |
//! | Consistency | 35%    | Agreement between the domain findings |
//! | Novelty     | 25%    | Distance from what the evidence already states |
//!
//! The weights are fixed. A hypothesis built purely from the vector fallback
//! scores `0.0` on Evidence and can never reach high overall confidence.
//!
//! ## Caller Uploads
//!
//! Caller-supplied passages enter the evidence pool as first-class items with
//! synthetic ids, citable like any fetched record:
//!
//! ```rust
//! use petri::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = SourceRegistry::new().with_connector(Arc::new(
//!     MockConnector::new(Source::Uniprot).with_passages(&[(
//!         "P05067",
//!         "Amyloid-beta precursor protein is cleaved into amyloid beta peptides.",
//!     )]),
//! ));
//! let config = PipelineConfig::default();
//! let coordinator = Coordinator::new(config.clone(), Retriever::new(config, registry));
//!
//! let notes = vec!["Unpublished assay: aggregation stalls under chaperone co-expression.".to_string()];
//! let result = coordinator
//!     .run_pipeline_with_context("amyloid aggregation", &notes)
//!     .await
//!     .unwrap();
//!
//! assert!(result.citations.contains_key("upload-1"));
//! # });
//! ```

// Re-export all subcrates
pub use petri_agents as agents;
pub use petri_connectors as connectors;
pub use petri_core as core;
pub use petri_model as model;
pub use petri_pipeline as pipeline;
pub use petri_retrieval as retrieval;

/// Prelude module for convenient imports.
///
/// ```rust
/// use petri::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use petri_core::types::{
        ConfidenceBreakdown, Domain, DomainFinding, EvidenceItem, HypothesisResult,
        PipelineDiagnostics, RetrievalResult, RunId, Source,
    };

    // Configuration
    pub use petri_core::config::{PipelineConfig, SourceConfig};

    // Model backends
    pub use petri_model::{
        Embedder, Generator, HashEmbedder, MockGenerator, ModelError, ModelResult,
        TemplateGenerator,
    };

    // Connectors
    pub use petri_connectors::{
        create_connector, Connector, ConnectorError, ConnectorResult, DrugbankConnector,
        MockConnector, RateLimiter,
    };

    #[cfg(feature = "http")]
    pub use petri_connectors::{PubmedConnector, UniprotConnector};

    // Retrieval
    pub use petri_retrieval::{
        merge_ranked, CorpusDocument, CorpusStore, EvidenceCache, JsonlCorpus, RetrievalError,
        RetrievalStats, Retriever, SourceRegistry, VectorIndex,
    };

    #[cfg(feature = "sqlite")]
    pub use petri_retrieval::SqliteCorpus;

    // Agents and synthesis
    pub use petri_agents::{
        default_agents, AgentError, AgentResult, CitationReport, ContextSelector, DomainAgent,
        DrugAgent, HypothesisSynthesizer, ImageAgent, LiteratureAgent, ProteinAgent,
        SynthesisOutput,
    };

    // Pipeline
    pub use petri_pipeline::{
        ConfidenceEvaluator, Coordinator, PipelineError, PipelineResult, PipelineState, RunTrace,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
