//! # Petri Core
//!
//! Shared types and configuration for the Petri evidence pipeline.
//!
//! Petri answers biomedical questions by retrieving evidence passages from
//! heterogeneous sources, synthesizing a cross-domain hypothesis, and scoring
//! it. This crate holds the vocabulary every other crate speaks:
//!
//! - **[`types::EvidenceItem`]** — one retrieved passage, identified by
//!   `(source, id)`
//! - **[`types::RetrievalResult`]** — the deduplicated, ranked evidence set
//! - **[`types::DomainFinding`]** — one domain agent's reading of the evidence
//! - **[`types::ConfidenceBreakdown`]** — Evidence/Consistency/Novelty
//!   sub-scores combined with fixed 40/35/25 weights
//! - **[`types::HypothesisResult`]** — hypothesis text, confidence, citations
//! - **[`config::PipelineConfig`]** — the immutable configuration threaded
//!   through the pipeline at construction time
//!
//! ## Quick Start
//!
//! ```rust
//! use petri_core::prelude::*;
//!
//! let config = PipelineConfig::default().with_source_enabled(Source::Drugbank, true);
//! assert!(config.is_enabled(Source::Drugbank));
//!
//! let item = EvidenceItem::new(Source::Pubmed, "31452104", "Amyloid beta ...", 1.0);
//! assert_eq!(item.identity(), (Source::Pubmed, "31452104"));
//! ```

pub mod config;
pub mod prelude;
pub mod text;
pub mod types;
