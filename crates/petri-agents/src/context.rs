//! Prompt context selection.
//!
//! The synthesis prompt cannot carry the whole evidence set, so passages are
//! ranked by a composite of semantic relevance, recency, and source quality,
//! then taken greedily until the character budget is spent.

use petri_core::types::{EvidenceItem, Source};
use serde::Serialize;
use std::time::SystemTime;
use tracing::debug;

/// Composite weights. Relevance dominates; recency and provenance refine.
pub const SEMANTIC_WEIGHT: f64 = 0.6;
pub const RECENCY_WEIGHT: f64 = 0.2;
pub const QUALITY_WEIGHT: f64 = 0.2;

/// Exponential decay applied per day of passage age.
const RECENCY_DECAY_PER_DAY: f64 = 0.1;
/// Passages scoring below this never enter the prompt.
const DEFAULT_MIN_COMBINED: f64 = 0.2;

/// Per-factor scores for one ranked passage.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PassageScore {
    pub semantic: f64,
    pub recency: f64,
    pub quality: f64,
    pub combined: f64,
}

/// A passage admitted to the synthesis prompt, with its ranking provenance.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedPassage {
    pub item: EvidenceItem,
    pub score: PassageScore,
}

/// Budget-bounded passage selector.
#[derive(Debug, Clone, Copy)]
pub struct ContextSelector {
    budget_chars: usize,
    min_combined: f64,
}

impl ContextSelector {
    pub fn new(budget_chars: usize) -> Self {
        Self {
            budget_chars,
            min_combined: DEFAULT_MIN_COMBINED,
        }
    }

    pub fn with_min_combined(mut self, min_combined: f64) -> Self {
        self.min_combined = min_combined;
        self
    }

    /// Rank all passages and take the best until the budget is spent.
    /// Selection stops at the first passage that would overflow it.
    pub fn select(&self, items: &[EvidenceItem], now: SystemTime) -> Vec<SelectedPassage> {
        let mut ranked: Vec<SelectedPassage> = items
            .iter()
            .map(|item| SelectedPassage {
                score: self.score(item, now),
                item: item.clone(),
            })
            .filter(|p| p.score.combined >= self.min_combined)
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .combined
                .partial_cmp(&a.score.combined)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });

        let mut selected = Vec::new();
        let mut spent = 0usize;
        for passage in ranked {
            let cost = passage.item.text.chars().count();
            if spent + cost > self.budget_chars {
                break;
            }
            spent += cost;
            selected.push(passage);
        }
        debug!(
            selected = selected.len(),
            candidates = items.len(),
            spent,
            budget = self.budget_chars,
            "selected prompt context"
        );
        selected
    }

    fn score(&self, item: &EvidenceItem, now: SystemTime) -> PassageScore {
        let semantic = item.score;
        let recency = (-RECENCY_DECAY_PER_DAY * item.age_days(now)).exp();
        let quality = quality_of(item);
        let combined =
            SEMANTIC_WEIGHT * semantic + RECENCY_WEIGHT * recency + QUALITY_WEIGHT * quality;
        PassageScore {
            semantic,
            recency,
            quality,
            combined,
        }
    }
}

/// Provenance quality: base 0.5, boosted for curated live sources and for
/// passages long enough to carry substance but short enough to stay focused.
fn quality_of(item: &EvidenceItem) -> f64 {
    let mut quality: f64 = 0.5;
    if matches!(item.source, Source::Pubmed | Source::Uniprot) {
        quality += 0.3;
    }
    let words = item.text.split_whitespace().count();
    if (50..=500).contains(&words) {
        quality += 0.2;
    }
    quality.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fresh(source: Source, id: &str, text: &str, score: f64) -> EvidenceItem {
        EvidenceItem::new(source, id, text, score)
    }

    #[test]
    fn weights_sum_to_one() {
        assert!((SEMANTIC_WEIGHT + RECENCY_WEIGHT + QUALITY_WEIGHT - 1.0).abs() < 1e-12);
    }

    #[test]
    fn curated_sources_outrank_fallback_at_equal_relevance() {
        let now = SystemTime::now();
        let items = vec![
            fresh(Source::VectorFallback, "corpus-1", "fallback passage", 0.8),
            fresh(Source::Pubmed, "100", "pubmed passage", 0.8),
        ];
        let selected = ContextSelector::new(10_000).select(&items, now);
        assert_eq!(selected[0].item.id, "100");
        assert!(selected[0].score.quality > selected[1].score.quality);
    }

    #[test]
    fn stale_passages_decay() {
        let now = SystemTime::now();
        let mut old = fresh(Source::Pubmed, "old", "stale passage", 0.9);
        old.fetched_at = now - Duration::from_secs(30 * 86_400);
        let new = fresh(Source::Pubmed, "new", "fresh passage", 0.9);
        let selected = ContextSelector::new(10_000).select(&[old, new], now);
        assert_eq!(selected[0].item.id, "new");
        // e^(-0.1 * 30) ≈ 0.05
        assert!(selected[1].score.recency < 0.1);
    }

    #[test]
    fn budget_caps_selection() {
        let now = SystemTime::now();
        let items: Vec<EvidenceItem> = (0..10)
            .map(|i| fresh(Source::Pubmed, &format!("p{i}"), &"x".repeat(100), 0.9))
            .collect();
        let selected = ContextSelector::new(250).select(&items, now);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn low_combined_scores_are_dropped() {
        let now = SystemTime::now();
        let mut weak = fresh(Source::VectorFallback, "weak", "barely related", 0.0);
        weak.fetched_at = now - Duration::from_secs(60 * 86_400);
        let selected = ContextSelector::new(10_000).select(&[weak], now);
        assert!(selected.is_empty());
    }

    #[test]
    fn ties_break_on_ascending_id() {
        let now = SystemTime::now();
        let items = vec![
            fresh(Source::Pubmed, "b", "same text", 0.7),
            fresh(Source::Pubmed, "a", "same text", 0.7),
        ];
        let selected = ContextSelector::new(10_000).select(&items, now);
        assert_eq!(selected[0].item.id, "a");
    }
}
