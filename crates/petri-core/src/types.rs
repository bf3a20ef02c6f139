//! Shared types used across all Petri crates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Unique identifier for one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An external evidence source. Live sources sit behind connectors;
/// `VectorFallback` and `Upload` are produced internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Pubmed,
    Uniprot,
    Drugbank,
    VectorFallback,
    Upload,
}

impl Source {
    /// The live connector-backed sources, in registry order.
    pub const LIVE: [Source; 3] = [Source::Pubmed, Source::Uniprot, Source::Drugbank];

    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Pubmed => "pubmed",
            Source::Uniprot => "uniprot",
            Source::Drugbank => "drugbank",
            Source::VectorFallback => "vector_fallback",
            Source::Upload => "upload",
        }
    }

    /// Whether this source is served by a live connector (and therefore
    /// governed by the source registry).
    pub fn is_live(&self) -> bool {
        matches!(self, Source::Pubmed | Source::Uniprot | Source::Drugbank)
    }

    /// Trusted sources count toward the evidence sub-score; fallback and
    /// caller-supplied passages do not.
    pub fn is_trusted(&self) -> bool {
        self.is_live()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pubmed" => Ok(Source::Pubmed),
            "uniprot" => Ok(Source::Uniprot),
            "drugbank" => Ok(Source::Drugbank),
            "vector_fallback" => Ok(Source::VectorFallback),
            "upload" => Ok(Source::Upload),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// Error for parsing a source name from user input.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown source: {0}")]
pub struct UnknownSource(pub String);

/// The analysis domain an agent covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Literature,
    Protein,
    Drug,
    Image,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Literature => "literature",
            Domain::Protein => "protein",
            Domain::Drug => "drug",
            Domain::Image => "image",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved evidence passage. Identity is `(source, id)`; the text is
/// immutable once fetched within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Stable, source-qualified identifier (PMID, UniProt accession, ...).
    pub id: String,
    /// The passage text presented to agents and cited in the hypothesis.
    pub text: String,
    pub source: Source,
    pub url: Option<String>,
    /// Similarity or relevance in [0, 1].
    pub score: f64,
    pub fetched_at: SystemTime,
}

impl EvidenceItem {
    pub fn new(source: Source, id: impl Into<String>, text: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source,
            url: None,
            score: score.clamp(0.0, 1.0),
            fetched_at: SystemTime::now(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The deduplication key.
    pub fn identity(&self) -> (Source, &str) {
        (self.source, self.id.as_str())
    }

    /// Age in days relative to `now`; zero when the clock went backwards.
    pub fn age_days(&self, now: SystemTime) -> f64 {
        now.duration_since(self.fetched_at)
            .map(|d| d.as_secs_f64() / 86_400.0)
            .unwrap_or(0.0)
    }
}

/// The unified output of one retrieval call: deduplicated by `(source, id)`,
/// sorted by descending score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub items: Vec<EvidenceItem>,
    /// True when any enabled source failed or the vector fallback was used.
    pub degraded: bool,
    pub warnings: Vec<String>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct sources represented, in stable order.
    pub fn sources(&self) -> BTreeSet<Source> {
        self.items.iter().map(|i| i.source).collect()
    }

    /// Look up an item by id across all sources.
    pub fn find(&self, id: &str) -> Option<&EvidenceItem> {
        self.items.iter().find(|i| i.id == id)
    }
}

/// One domain agent's reading of the evidence set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainFinding {
    pub domain: Domain,
    pub text: String,
    /// Ids of the evidence items the finding rests on.
    pub cited_ids: BTreeSet<String>,
}

impl DomainFinding {
    pub fn new(domain: Domain, text: impl Into<String>) -> Self {
        Self {
            domain,
            text: text.into(),
            cited_ids: BTreeSet::new(),
        }
    }

    pub fn cite(mut self, id: impl Into<String>) -> Self {
        self.cited_ids.insert(id.into());
        self
    }
}

/// Fixed combination weights for the overall confidence percentage.
pub const WEIGHT_EVIDENCE: f64 = 0.40;
pub const WEIGHT_CONSISTENCY: f64 = 0.35;
pub const WEIGHT_NOVELTY: f64 = 0.25;

/// Confidence decomposed into its three sub-scores. Construct through
/// [`ConfidenceBreakdown::from_scores`] so the overall percentage always
/// reflects the fixed weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// Strength of corroborating evidence, 0..1.
    pub evidence: f64,
    /// Agreement between domain findings, 0..1.
    pub consistency: f64,
    /// Distance of the hypothesis from what the evidence already states, 0..1.
    pub novelty: f64,
    /// `100 * (0.40*evidence + 0.35*consistency + 0.25*novelty)`, clamped.
    pub overall_percentage: f64,
}

impl ConfidenceBreakdown {
    pub fn from_scores(evidence: f64, consistency: f64, novelty: f64) -> Self {
        let evidence = evidence.clamp(0.0, 1.0);
        let consistency = consistency.clamp(0.0, 1.0);
        let novelty = novelty.clamp(0.0, 1.0);
        Self {
            evidence,
            consistency,
            novelty,
            overall_percentage: Self::combine(evidence, consistency, novelty),
        }
    }

    /// The weighted combination on its own, for recomputation checks.
    pub fn combine(evidence: f64, consistency: f64, novelty: f64) -> f64 {
        let pct = 100.0
            * (WEIGHT_EVIDENCE * evidence
                + WEIGHT_CONSISTENCY * consistency
                + WEIGHT_NOVELTY * novelty);
        pct.clamp(0.0, 100.0)
    }
}

/// Timings and counters for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    pub retrieval_ms: u64,
    pub analysis_ms: u64,
    pub synthesis_ms: u64,
    pub scoring_ms: u64,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub sources_queried: usize,
    pub sources_failed: usize,
}

/// The pipeline's final answer: hypothesis text with inline citation markers,
/// the confidence breakdown, and the marker-id → evidence mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisResult {
    pub text: String,
    pub confidence: ConfidenceBreakdown,
    pub citations: BTreeMap<String, EvidenceItem>,
    pub warnings: Vec<String>,
    pub diagnostics: PipelineDiagnostics,
}
