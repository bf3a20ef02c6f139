//! Term extraction and overlap metrics.
//!
//! Shared by the query keywordizer, the consistency metric (pairwise finding
//! overlap), and the novelty metric (hypothesis coverage by evidence).

use std::collections::{BTreeSet, HashSet};

/// Extract lowercase terms from free text: whitespace split, punctuation
/// trimmed, stopwords and anything shorter than three characters dropped.
/// Preserves order and duplicates.
pub fn terms(text: &str) -> Vec<String> {
    let stopwords: HashSet<&str> = [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being",
        "have", "has", "had", "do", "does", "did", "will", "would", "could",
        "should", "may", "might", "shall", "can", "need", "dare", "ought",
        "used", "to", "of", "in", "for", "on", "with", "at", "by", "from",
        "as", "into", "through", "during", "before", "after", "above", "below",
        "between", "out", "off", "over", "under", "again", "further", "then",
        "once", "here", "there", "when", "where", "why", "how", "all", "each",
        "every", "both", "few", "more", "most", "other", "some", "such", "no",
        "nor", "not", "only", "own", "same", "so", "than", "too", "very",
        "and", "but", "or", "if", "while", "what", "which", "who", "this",
        "that", "these", "those", "it", "its",
    ]
    .iter()
    .cloned()
    .collect();

    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.len() >= 3 && !stopwords.contains(w.as_str()))
        .collect()
}

/// The distinct terms of a text, for set overlap.
pub fn term_set(text: &str) -> BTreeSet<String> {
    terms(text).into_iter().collect()
}

/// Jaccard similarity between two term sets; 0.0 when both are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Fraction of `needle` covered by `hay`: |needle ∩ hay| / |needle|.
/// 0.0 when `needle` is empty.
pub fn containment(needle: &BTreeSet<String>, hay: &BTreeSet<String>) -> f64 {
    if needle.is_empty() {
        return 0.0;
    }
    let covered = needle.intersection(hay).count();
    covered as f64 / needle.len() as f64
}
