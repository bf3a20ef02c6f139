//! Domain agents: pluggable readers over one shared evidence set.
//!
//! Every agent sees the full [`RetrievalResult`] and scopes itself to the
//! sources it understands. A finding quotes the passages it rests on and
//! marks each quote with `[Source ID: <id>]` so citations survive synthesis.

use async_trait::async_trait;
use petri_core::text;
use petri_core::types::{Domain, DomainFinding, EvidenceItem, RetrievalResult, Source};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::{AgentError, AgentResult};

/// Passages quoted per finding.
const MAX_QUOTED: usize = 4;
/// Key terms named in a finding's opening sentence.
const MAX_KEY_TERMS: usize = 5;
/// Character cap for a quoted passage lead.
const LEAD_CHARS: usize = 200;

/// A domain-scoped reader of the evidence set.
///
/// Agents run independently and in parallel; a failing agent costs the
/// pipeline one finding, never the run.
#[async_trait]
pub trait DomainAgent: Send + Sync {
    /// The domain this agent covers.
    fn domain(&self) -> Domain;

    /// Produce a finding from the evidence in scope for this domain.
    ///
    /// Errors with [`AgentError::NothingToAnalyze`] when the set holds
    /// nothing the agent can read.
    async fn analyze(
        &self,
        query: &str,
        evidence: &RetrievalResult,
    ) -> AgentResult<DomainFinding>;
}

/// The stock agent set, in the order findings are reported.
pub fn default_agents() -> Vec<Arc<dyn DomainAgent>> {
    vec![
        Arc::new(LiteratureAgent::new()),
        Arc::new(ProteinAgent::new()),
        Arc::new(DrugAgent::new()),
        Arc::new(ImageAgent::new()),
    ]
}

/// Reads published abstracts: PubMed plus whatever the fallback index or the
/// caller supplied as free text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteratureAgent;

impl LiteratureAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DomainAgent for LiteratureAgent {
    fn domain(&self) -> Domain {
        Domain::Literature
    }

    async fn analyze(
        &self,
        query: &str,
        evidence: &RetrievalResult,
    ) -> AgentResult<DomainFinding> {
        let items = in_scope(
            evidence,
            &[Source::Pubmed, Source::VectorFallback, Source::Upload],
        );
        if items.is_empty() {
            return Err(AgentError::NothingToAnalyze(Domain::Literature));
        }
        let opening = format!(
            "Published literature on {} converges on {}.",
            query.trim(),
            join_terms(&top_terms(&items, MAX_KEY_TERMS)),
        );
        Ok(compose(Domain::Literature, opening, &items))
    }
}

/// Reads reviewed protein records (UniProt).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProteinAgent;

impl ProteinAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DomainAgent for ProteinAgent {
    fn domain(&self) -> Domain {
        Domain::Protein
    }

    async fn analyze(
        &self,
        query: &str,
        evidence: &RetrievalResult,
    ) -> AgentResult<DomainFinding> {
        let items = in_scope(evidence, &[Source::Uniprot]);
        if items.is_empty() {
            return Err(AgentError::NothingToAnalyze(Domain::Protein));
        }
        let opening = format!(
            "Protein records relevant to {} implicate {}.",
            query.trim(),
            join_terms(&top_terms(&items, MAX_KEY_TERMS)),
        );
        Ok(compose(Domain::Protein, opening, &items))
    }
}

/// Reads drug and compound records (DrugBank).
#[derive(Debug, Clone, Copy, Default)]
pub struct DrugAgent;

impl DrugAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DomainAgent for DrugAgent {
    fn domain(&self) -> Domain {
        Domain::Drug
    }

    async fn analyze(
        &self,
        query: &str,
        evidence: &RetrievalResult,
    ) -> AgentResult<DomainFinding> {
        let items = in_scope(evidence, &[Source::Drugbank]);
        if items.is_empty() {
            return Err(AgentError::NothingToAnalyze(Domain::Drug));
        }
        let opening = format!(
            "Drug and compound records relevant to {} cover {}.",
            query.trim(),
            join_terms(&top_terms(&items, MAX_KEY_TERMS)),
        );
        Ok(compose(Domain::Drug, opening, &items))
    }
}

/// Terms that mark a passage as reporting imaging evidence.
const MODALITY_TERMS: [&str; 12] = [
    "imaging",
    "microscopy",
    "mri",
    "tomography",
    "radiograph",
    "x-ray",
    "ultrasound",
    "histology",
    "histopathology",
    "immunostaining",
    "staining",
    "fluorescence",
];

/// Reads imaging findings reported inside text evidence. There is no image
/// pixel pipeline; this agent surfaces passages that describe a modality and
/// stays silent when none do.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageAgent;

impl ImageAgent {
    pub fn new() -> Self {
        Self
    }

    fn modality_of(text: &str) -> Option<&'static str> {
        let lower = text.to_lowercase();
        MODALITY_TERMS.iter().find(|t| lower.contains(**t)).copied()
    }
}

#[async_trait]
impl DomainAgent for ImageAgent {
    fn domain(&self) -> Domain {
        Domain::Image
    }

    async fn analyze(
        &self,
        query: &str,
        evidence: &RetrievalResult,
    ) -> AgentResult<DomainFinding> {
        let items: Vec<(&EvidenceItem, &'static str)> = evidence
            .items
            .iter()
            .filter_map(|i| Self::modality_of(&i.text).map(|m| (i, m)))
            .take(MAX_QUOTED)
            .collect();
        if items.is_empty() {
            return Err(AgentError::NothingToAnalyze(Domain::Image));
        }
        let modalities: Vec<&str> = {
            let mut seen = Vec::new();
            for (_, m) in &items {
                if !seen.contains(m) {
                    seen.push(*m);
                }
            }
            seen
        };
        let mut finding = DomainFinding::new(
            Domain::Image,
            format!(
                "Imaging evidence on {} reports {} observations.",
                query.trim(),
                modalities.join(" and "),
            ),
        );
        for (item, _) in &items {
            finding.text.push_str(&format!(
                " {} [Source ID: {}].",
                lead(&item.text, LEAD_CHARS),
                item.id
            ));
            finding.cited_ids.insert(item.id.clone());
        }
        debug!(domain = %Domain::Image, quoted = items.len(), "composed finding");
        Ok(finding)
    }
}

/// Evidence in scope for a source set, preserving the ranked order.
fn in_scope<'a>(evidence: &'a RetrievalResult, sources: &[Source]) -> Vec<&'a EvidenceItem> {
    evidence
        .items
        .iter()
        .filter(|i| sources.contains(&i.source))
        .take(MAX_QUOTED)
        .collect()
}

/// Frequency-ranked distinct terms across a passage set; ties break
/// alphabetically so findings are stable.
fn top_terms(items: &[&EvidenceItem], n: usize) -> Vec<String> {
    let mut freq: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        for term in text::terms(&item.text) {
            *freq.entry(term).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(t, _)| t).collect()
}

fn join_terms(terms: &[String]) -> String {
    if terms.is_empty() {
        return "no recurring terms".to_string();
    }
    terms.join(", ")
}

/// First sentence of a passage, capped at `max_chars` on a word boundary.
fn lead(text: &str, max_chars: usize) -> String {
    let first = text.split_once(". ").map(|(s, _)| s).unwrap_or(text);
    let trimmed = first.trim().trim_end_matches('.');
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(pos) => format!("{}...", &cut[..pos]),
        None => format!("{cut}..."),
    }
}

/// Opening sentence plus one cited quote per passage.
fn compose(domain: Domain, opening: String, items: &[&EvidenceItem]) -> DomainFinding {
    let mut finding = DomainFinding::new(domain, opening);
    for item in items {
        finding.text.push_str(&format!(
            " {} [Source ID: {}].",
            lead(&item.text, LEAD_CHARS),
            item.id
        ));
        finding.cited_ids.insert(item.id.clone());
    }
    debug!(domain = %domain, quoted = items.len(), "composed finding");
    finding
}
