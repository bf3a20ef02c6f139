//! # Petri Model
//!
//! Embedding and generation interfaces for the Petri pipeline.
//!
//! Model invocation is an external collaborator: the pipeline only sees the
//! [`Embedder`] and [`Generator`] traits. This crate ships deterministic
//! implementations that work without any model weights or network access:
//!
//! - [`HashEmbedder`] — hash-based fixed-dimension embeddings, the baseline
//!   behind the vector fallback index
//! - [`TemplateGenerator`] — rule-based hypothesis composition that preserves
//!   citation markers from its context
//! - [`MockGenerator`] — scripted responses with call counting, for tests
//!
//! HTTP-backed implementations slot in behind the same traits.

pub mod embedder;
pub mod generator;

pub use embedder::{Embedder, HashEmbedder};
pub use generator::{Generator, MockGenerator, TemplateGenerator};

use thiserror::Error;

/// Model invocation errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
