//! Inline citation markers.
//!
//! Agents and generators mark claims with `[Source ID: <id>]`. This module
//! extracts those markers and resolves them against the retrieved evidence,
//! so every citation in a
//! [`HypothesisResult`](petri_core::types::HypothesisResult) maps back to a
//! concrete passage.

use petri_core::types::{EvidenceItem, RetrievalResult};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Marker shape emitted by agents and required of generators. One marker may
/// carry several comma-separated ids.
pub const MARKER_PATTERN: &str = r"\[Source ID:\s*([^\]]+)\]";

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MARKER_PATTERN).expect("marker pattern is valid"))
}

/// All ids cited in `text`, in order of first appearance, deduplicated.
pub fn extract_marker_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for cap in marker_regex().captures_iter(text) {
        for id in cap[1].split(',') {
            let id = id.trim();
            if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// Resolution of a hypothesis' citations against the evidence set.
#[derive(Debug, Clone, Default)]
pub struct CitationReport {
    /// Cited ids that resolve, mapped to their evidence.
    pub citations: BTreeMap<String, EvidenceItem>,
    /// Cited ids with no matching evidence item, in citation order.
    pub unresolved: Vec<String>,
}

impl CitationReport {
    /// Fraction of cited ids that resolve; 0.0 when nothing is cited.
    pub fn source_coverage(&self) -> f64 {
        let total = self.citations.len() + self.unresolved.len();
        if total == 0 {
            return 0.0;
        }
        self.citations.len() as f64 / total as f64
    }

    /// One warning per unresolved id, plus one when the text cites nothing.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.citations.is_empty() && self.unresolved.is_empty() {
            warnings.push("hypothesis cites no sources".to_string());
        }
        for id in &self.unresolved {
            warnings.push(format!(
                "cited id {id} does not match any retrieved evidence"
            ));
        }
        warnings
    }
}

/// Extract every marker in `text` and resolve it against `evidence`.
pub fn map_citations(text: &str, evidence: &RetrievalResult) -> CitationReport {
    let mut report = CitationReport::default();
    for id in extract_marker_ids(text) {
        match evidence.find(&id) {
            Some(item) => {
                report.citations.insert(id, item.clone());
            }
            None => report.unresolved.push(id),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_core::types::Source;

    fn evidence() -> RetrievalResult {
        RetrievalResult {
            items: vec![
                EvidenceItem::new(Source::Pubmed, "31452104", "abstract text", 1.0),
                EvidenceItem::new(Source::Uniprot, "P05067", "protein record", 0.9),
            ],
            degraded: false,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn extracts_ids_in_order_without_duplicates() {
        let text = "Claim [Source ID: a]. More [Source ID: b] and again [Source ID: a].";
        assert_eq!(extract_marker_ids(text), vec!["a", "b"]);
    }

    #[test]
    fn splits_comma_separated_markers() {
        let text = "Converging evidence [Source ID: 123, P05067].";
        assert_eq!(extract_marker_ids(text), vec!["123", "P05067"]);
    }

    #[test]
    fn tolerates_spacing_after_the_colon() {
        assert_eq!(extract_marker_ids("[Source ID:  x]"), vec!["x"]);
        assert!(extract_marker_ids("[source id: x]").is_empty());
    }

    #[test]
    fn resolves_citations_across_sources() {
        let report = map_citations(
            "Amyloid [Source ID: 31452104] binds APP [Source ID: P05067].",
            &evidence(),
        );
        assert_eq!(report.citations.len(), 2);
        assert_eq!(report.citations["P05067"].source, Source::Uniprot);
        assert!(report.unresolved.is_empty());
        assert_eq!(report.source_coverage(), 1.0);
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn unresolved_ids_are_reported_and_lower_coverage() {
        let report = map_citations(
            "Known [Source ID: 31452104], unknown [Source ID: ghost].",
            &evidence(),
        );
        assert_eq!(report.unresolved, vec!["ghost"]);
        assert!((report.source_coverage() - 0.5).abs() < 1e-12);
        let warnings = report.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ghost"));
    }

    #[test]
    fn uncited_text_yields_a_warning_and_zero_coverage() {
        let report = map_citations("No markers here.", &evidence());
        assert_eq!(report.source_coverage(), 0.0);
        assert_eq!(report.warnings(), vec!["hypothesis cites no sources"]);
    }
}
