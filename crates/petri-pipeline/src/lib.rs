//! # Petri Pipeline
//!
//! The coordinator that turns one biomedical query into one scored,
//! source-cited hypothesis.
//!
//! A run walks a fixed state path:
//!
//! ```text
//! Idle -> Retrieving -> Analyzing -> Synthesizing -> Scoring -> Done
//! ```
//!
//! with `Failed` as the terminal state for fatal errors. Connector failures
//! are not fatal: retrieval absorbs them into the degraded flag and warnings,
//! and the run keeps going as long as any evidence at all came back.
//!
//! Scoring decomposes confidence into evidence strength, cross-domain
//! consistency, and novelty, combined under fixed weights into a percentage.
//! The metrics are deterministic: the same evidence and findings always score
//! the same.

pub mod confidence;
pub mod coordinator;

pub use confidence::{
    consistency_score, evidence_score, novelty_score, ConfidenceEvaluator, ScoreError,
};
pub use coordinator::{Coordinator, PipelineState, RunTrace};

use thiserror::Error;

/// Fatal pipeline errors. Everything here terminates the run in `Failed`;
/// per-source trouble never appears because retrieval degrades instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The query was empty or whitespace. Rejected before any I/O.
    #[error("Query is empty")]
    InvalidQuery,

    /// Every source failed or returned nothing, and the fallback was empty
    /// too. There is nothing to analyze.
    #[error("No evidence available: every source and the fallback came up empty")]
    NoEvidenceAvailable,

    /// No domain agent produced a finding, so there is nothing to merge.
    #[error("Synthesis impossible: no domain agent produced a finding")]
    SynthesisImpossible,

    /// A confidence sub-score left [0, 1]. Does not occur with the shipped
    /// metrics; guards custom ones.
    #[error("Scoring failed: {0}")]
    Scoring(#[from] confidence::ScoreError),

    #[error("Pipeline internal error: {0}")]
    Internal(String),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
