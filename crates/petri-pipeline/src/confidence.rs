//! Confidence scoring.
//!
//! Three sub-scores in [0, 1], each a pure function of the run's artifacts:
//!
//! - **evidence** — volume and quality of trusted items
//! - **consistency** — agreement between domain findings
//! - **novelty** — distance of the hypothesis from what the evidence states
//!
//! [`ConfidenceBreakdown::from_scores`] combines them under the fixed 40/35/25
//! weights. The evaluator validates sub-scores before combining so a custom
//! metric cannot poison the percentage.

use petri_core::text;
use petri_core::types::{ConfidenceBreakdown, DomainFinding, RetrievalResult};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Trusted-item count at which the evidence volume term saturates.
const EVIDENCE_SATURATION: usize = 5;

/// Terms marking a passage as mechanistically informative.
const INDICATOR_TERMS: [&str; 9] = [
    "protein",
    "gene",
    "drug",
    "disease",
    "mechanism",
    "pathway",
    "target",
    "inhibition",
    "activation",
];

/// Phrases marking a claim as already established.
const KNOWN_PATTERNS: [&str; 8] = [
    "already known",
    "previously reported",
    "established",
    "well-documented",
    "common",
    "typical",
    "standard",
    "conventional",
];

/// Phrases marking a claim as new.
const NOVEL_INDICATORS: [&str; 5] = [
    "novel",
    "new",
    "unprecedented",
    "previously unknown",
    "first report",
];

/// Stem pairs that read in opposite directions.
const OPPOSING_STEMS: [(&str, &str); 4] = [
    ("increas", "decreas"),
    ("activat", "inhibit"),
    ("upregulat", "downregulat"),
    ("promot", "suppress"),
];

const KNOWN_PENALTY: f64 = 0.2;
const NOVEL_BONUS: f64 = 0.1;
/// Hypothesis-term containment in one passage above which the hypothesis
/// counts as a restatement.
const RESTATEMENT_THRESHOLD: f64 = 0.8;
const RESTATEMENT_PENALTY: f64 = 0.5;
const CONTRADICTION_PENALTY: f64 = 0.5;
/// Bonus for a finding pair citing at least one common evidence item.
const SHARED_CITATION_BONUS: f64 = 0.25;
/// Consistency when fewer than two findings exist.
const NEUTRAL_CONSISTENCY: f64 = 0.5;

/// A sub-score left [0, 1] or went non-finite.
#[derive(Debug, Clone, Error)]
#[error("{name} sub-score out of range: {value}")]
pub struct ScoreError {
    pub name: &'static str,
    pub value: f64,
}

/// Scores a completed run. Stateless; the methods exist so callers hold one
/// value they could later swap for a tuned variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceEvaluator;

impl ConfidenceEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Score a run from its retrieval result, findings, and hypothesis.
    pub fn evaluate(
        &self,
        evidence: &RetrievalResult,
        findings: &[DomainFinding],
        hypothesis: &str,
    ) -> Result<ConfidenceBreakdown, ScoreError> {
        let breakdown = Self::breakdown(
            evidence_score(evidence),
            consistency_score(findings),
            novelty_score(hypothesis, evidence),
        )?;
        debug!(
            evidence = breakdown.evidence,
            consistency = breakdown.consistency,
            novelty = breakdown.novelty,
            overall = breakdown.overall_percentage,
            "scored hypothesis"
        );
        Ok(breakdown)
    }

    /// Validate raw sub-scores and combine them under the fixed weights.
    pub fn breakdown(
        evidence: f64,
        consistency: f64,
        novelty: f64,
    ) -> Result<ConfidenceBreakdown, ScoreError> {
        for (name, value) in [
            ("evidence", evidence),
            ("consistency", consistency),
            ("novelty", novelty),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ScoreError { name, value });
            }
        }
        Ok(ConfidenceBreakdown::from_scores(evidence, consistency, novelty))
    }
}

/// Evidence strength: how much trusted material came back and how good it is.
///
/// The volume term saturates at [`EVIDENCE_SATURATION`] distinct trusted
/// items. Quality averages the item scores with the density of biomedical
/// indicator terms. Fallback and upload items carry no weight here; a run
/// living off the local index scores zero evidence no matter how many
/// neighbors it found.
pub fn evidence_score(evidence: &RetrievalResult) -> f64 {
    let trusted: Vec<_> = evidence
        .items
        .iter()
        .filter(|i| i.source.is_trusted())
        .collect();
    if trusted.is_empty() {
        return 0.0;
    }
    let volume = (trusted.len() as f64 / EVIDENCE_SATURATION as f64).min(1.0);
    let avg_score = trusted.iter().map(|i| i.score).sum::<f64>() / trusted.len() as f64;
    let indicators = trusted
        .iter()
        .map(|i| indicator_density(&i.text))
        .sum::<f64>()
        / trusted.len() as f64;
    let quality = (avg_score + indicators) / 2.0;
    ((volume + quality) / 2.0).clamp(0.0, 1.0)
}

fn indicator_density(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let hits = INDICATOR_TERMS.iter().filter(|t| lower.contains(**t)).count();
    hits as f64 / INDICATOR_TERMS.len() as f64
}

/// Agreement between domain findings.
///
/// Each pair scores the overlap coefficient of its term sets, raised when the
/// pair cites a common evidence item, halved when the texts pull in opposite
/// directions. The mean pair score is blended with a global agreement term
/// that drops to 0.5 on any contradiction. Fewer than two findings cannot
/// agree or disagree and sit at [`NEUTRAL_CONSISTENCY`].
pub fn consistency_score(findings: &[DomainFinding]) -> f64 {
    if findings.len() < 2 {
        return NEUTRAL_CONSISTENCY;
    }
    let sets: Vec<BTreeSet<String>> = findings.iter().map(|f| text::term_set(&f.text)).collect();

    let mut pair_scores = Vec::new();
    let mut contradiction = false;
    for i in 0..findings.len() {
        for j in (i + 1)..findings.len() {
            let mut score = overlap_coefficient(&sets[i], &sets[j]);
            if findings[i]
                .cited_ids
                .intersection(&findings[j].cited_ids)
                .next()
                .is_some()
            {
                score = (score + SHARED_CITATION_BONUS).min(1.0);
            }
            if contradicts(&findings[i].text, &findings[j].text) {
                score *= CONTRADICTION_PENALTY;
                contradiction = true;
            }
            pair_scores.push(score);
        }
    }
    let mean = pair_scores.iter().sum::<f64>() / pair_scores.len() as f64;
    let agreement = if contradiction { 0.5 } else { 1.0 };
    ((agreement + mean) / 2.0).clamp(0.0, 1.0)
}

/// |a ∩ b| / min(|a|, |b|); 0.0 when either set is empty.
fn overlap_coefficient(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.len() <= b.len() {
        text::containment(a, b)
    } else {
        text::containment(b, a)
    }
}

fn contradicts(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    OPPOSING_STEMS.iter().any(|(x, y)| {
        (a.contains(x) && b.contains(y)) || (a.contains(y) && b.contains(x))
    })
}

/// Novelty: how far the hypothesis moves beyond what the evidence states.
///
/// Starts at 1.0, loses [`KNOWN_PENALTY`] per established-knowledge phrase,
/// regains [`NOVEL_BONUS`] per novelty phrase (capped at 1.0), and is halved
/// when the hypothesis merely restates a single retrieved passage.
pub fn novelty_score(hypothesis: &str, evidence: &RetrievalResult) -> f64 {
    let lower = hypothesis.to_lowercase();
    let known = KNOWN_PATTERNS.iter().filter(|p| lower.contains(**p)).count();
    let novel = NOVEL_INDICATORS.iter().filter(|p| lower.contains(**p)).count();

    let mut novelty = (1.0 - KNOWN_PENALTY * known as f64).max(0.0);
    novelty = (novelty + NOVEL_BONUS * novel as f64).min(1.0);

    let hypothesis_terms = text::term_set(hypothesis);
    let restated = evidence.items.iter().any(|item| {
        text::containment(&hypothesis_terms, &text::term_set(&item.text)) >= RESTATEMENT_THRESHOLD
    });
    if restated {
        novelty *= RESTATEMENT_PENALTY;
    }
    novelty.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_core::types::{
        Domain, EvidenceItem, Source, WEIGHT_CONSISTENCY, WEIGHT_EVIDENCE, WEIGHT_NOVELTY,
    };

    fn result_with(items: Vec<EvidenceItem>) -> RetrievalResult {
        RetrievalResult {
            items,
            degraded: false,
            warnings: Vec::new(),
        }
    }

    fn finding(domain: Domain, text: &str) -> DomainFinding {
        DomainFinding::new(domain, text)
    }

    #[test]
    fn untrusted_evidence_scores_zero() {
        let result = result_with(vec![
            EvidenceItem::new(Source::VectorFallback, "c1", "protein pathway", 0.9),
            EvidenceItem::new(Source::Upload, "upload-1", "gene mechanism", 1.0),
        ]);
        assert_eq!(evidence_score(&result), 0.0);
    }

    #[test]
    fn evidence_volume_saturates_at_five_trusted_items() {
        let item = |id: &str| EvidenceItem::new(Source::Pubmed, id, "protein pathway target", 0.9);
        let five = result_with((0..5).map(|i| item(&i.to_string())).collect());
        let eight = result_with((0..8).map(|i| item(&i.to_string())).collect());
        assert!((evidence_score(&five) - evidence_score(&eight)).abs() < 1e-12);
    }

    #[test]
    fn indicator_terms_lift_quality() {
        let plain = result_with(vec![EvidenceItem::new(
            Source::Pubmed,
            "1",
            "an unrelated observation about weather",
            0.9,
        )]);
        let dense = result_with(vec![EvidenceItem::new(
            Source::Pubmed,
            "1",
            "protein gene drug disease mechanism pathway",
            0.9,
        )]);
        assert!(evidence_score(&dense) > evidence_score(&plain));
    }

    #[test]
    fn fewer_than_two_findings_sit_at_neutral() {
        assert_eq!(consistency_score(&[]), 0.5);
        let one = finding(Domain::Literature, "amyloid drives aggregation");
        assert_eq!(consistency_score(&[one]), 0.5);
    }

    #[test]
    fn reinforcing_findings_with_shared_citations_score_one() {
        let a = finding(Domain::Literature, "amyloid beta drives plaque formation").cite("101");
        let b = finding(Domain::Protein, "amyloid beta drives plaque formation").cite("101");
        assert!((consistency_score(&[a, b]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn contradicting_findings_score_below_neutral() {
        let a = finding(Domain::Literature, "compound activates the repair pathway in neurons");
        let contradicting = finding(Domain::Drug, "compound inhibits the repair pathway in neurons");
        let aligned = finding(Domain::Drug, "compound modulates the repair pathway in neurons");

        let with_contradiction = consistency_score(&[a.clone(), contradicting]);
        let without = consistency_score(&[a, aligned]);
        assert!(with_contradiction < without);
        assert!(with_contradiction < NEUTRAL_CONSISTENCY);
    }

    #[test]
    fn orthogonal_findings_land_on_neutral() {
        let a = finding(Domain::Literature, "amyloid plaque burden rises");
        let b = finding(Domain::Drug, "glucose transport kinetics");
        assert!((consistency_score(&[a, b]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn known_patterns_reduce_novelty() {
        let empty = RetrievalResult::default();
        let score = novelty_score(
            "This mechanism is well-documented and previously reported.",
            &empty,
        );
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn novel_indicators_recover_novelty_up_to_the_cap() {
        let empty = RetrievalResult::default();
        assert!((novelty_score("A novel link.", &empty) - 1.0).abs() < 1e-12);
        let mixed = novelty_score("An established pathway with a novel regulator.", &empty);
        assert!((mixed - 0.9).abs() < 1e-12);
    }

    #[test]
    fn restating_one_passage_halves_novelty() {
        let passage = "amyloid beta aggregation disrupts synaptic signaling in cortical neurons";
        let result = result_with(vec![EvidenceItem::new(Source::Pubmed, "1", passage, 1.0)]);
        let score = novelty_score(passage, &result);
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn breakdown_rejects_non_finite_and_out_of_range_scores() {
        assert!(ConfidenceEvaluator::breakdown(f64::NAN, 0.5, 0.5).is_err());
        assert!(ConfidenceEvaluator::breakdown(0.5, 1.2, 0.5).is_err());
        assert!(ConfidenceEvaluator::breakdown(0.5, 0.5, -0.1).is_err());
        assert!(ConfidenceEvaluator::breakdown(1.0, 0.0, 0.5).is_ok());
    }

    #[test]
    fn evaluate_produces_a_recomputable_percentage() {
        let result = result_with(vec![
            EvidenceItem::new(Source::Pubmed, "1", "protein pathway in disease", 0.9),
            EvidenceItem::new(Source::Uniprot, "P1", "gene target mechanism", 0.8),
        ]);
        let findings = vec![
            finding(Domain::Literature, "protein pathway links to disease").cite("1"),
            finding(Domain::Protein, "gene target sits on the same pathway").cite("P1"),
        ];
        let breakdown = ConfidenceEvaluator::new()
            .evaluate(&result, &findings, "The pathway couples both targets.")
            .unwrap();
        assert!(breakdown.overall_percentage > 0.0 && breakdown.overall_percentage <= 100.0);
        let recomputed = 100.0
            * (WEIGHT_EVIDENCE * breakdown.evidence
                + WEIGHT_CONSISTENCY * breakdown.consistency
                + WEIGHT_NOVELTY * breakdown.novelty);
        assert!((breakdown.overall_percentage - recomputed).abs() < 1e-9);
    }
}
