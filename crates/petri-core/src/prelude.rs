//! Petri Core Prelude — convenient imports for common usage.
//!
//! ```rust
//! use petri_core::prelude::*;
//! ```

pub use crate::config::{PipelineConfig, SourceConfig};
pub use crate::types::{
    ConfidenceBreakdown, Domain, DomainFinding, EvidenceItem, HypothesisResult,
    PipelineDiagnostics, RetrievalResult, RunId, Source,
};
