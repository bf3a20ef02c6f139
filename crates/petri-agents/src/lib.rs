//! # Petri Agents
//!
//! Domain analysis and hypothesis synthesis over a retrieved evidence set.
//!
//! Four stock agents read the same
//! [`RetrievalResult`](petri_core::types::RetrievalResult) through the
//! [`DomainAgent`] trait, each scoped to the sources it understands:
//!
//! - [`LiteratureAgent`] — published abstracts (PubMed, fallback, uploads)
//! - [`ProteinAgent`] — reviewed protein records (UniProt)
//! - [`DrugAgent`] — drug and compound records (DrugBank)
//! - [`ImageAgent`] — imaging findings reported inside text evidence
//!
//! The [`HypothesisSynthesizer`] merges their findings into one hypothesis with
//! inline `[Source ID: <id>]` markers, selecting prompt context with the
//! composite relevance/recency/quality ranking in [`context`].

pub mod agent;
pub mod citations;
pub mod context;
pub mod synthesizer;

pub use agent::{
    default_agents, DomainAgent, DrugAgent, ImageAgent, LiteratureAgent, ProteinAgent,
};
pub use citations::{extract_marker_ids, map_citations, CitationReport};
pub use context::{ContextSelector, PassageScore, SelectedPassage};
pub use synthesizer::{HypothesisSynthesizer, SynthesisOutput};

use petri_core::types::Domain;
use thiserror::Error;

/// Errors from domain analysis and synthesis.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The evidence set holds nothing this agent can read. The coordinator
    /// records this as a missing finding, not a pipeline failure.
    #[error("No {0} evidence to analyze")]
    NothingToAnalyze(Domain),

    /// Synthesis was invoked with zero findings.
    #[error("No domain findings to synthesize")]
    NoFindings,

    /// The generation backend failed.
    #[error("Generation failed: {0}")]
    Generation(#[from] petri_model::ModelError),

    /// The generator produced an empty hypothesis.
    #[error("Generator produced an empty hypothesis")]
    EmptyHypothesis,
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
