//! In-memory vector index for the fallback path.

use crate::corpus::CorpusStore;
use crate::{RetrievalError, RetrieveResult};
use petri_model::Embedder;
use std::cmp::Ordering;
use std::sync::RwLock;
use tracing::{debug, warn};

struct IndexedDoc {
    id: String,
    vector: Vec<f32>,
}

/// Brute-force cosine index over embedded corpus documents.
///
/// Scores map cosine similarity from [-1, 1] into [0, 1] so fallback items
/// rank on the same scale as connector results. Search is a linear scan;
/// fallback corpora are small enough that nothing smarter is warranted.
pub struct VectorIndex {
    dimension: usize,
    docs: RwLock<Vec<IndexedDoc>>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Embed every corpus document into a fresh index. Documents that fail
    /// to embed are skipped with a warning; an empty corpus yields an empty
    /// index.
    pub async fn build_from_corpus(
        embedder: &dyn Embedder,
        corpus: &dyn CorpusStore,
    ) -> RetrieveResult<Self> {
        let index = Self::new(embedder.dimension());
        let mut skipped = 0usize;
        for doc in corpus.all() {
            match embedder.embed(&doc.text).await {
                Ok(vector) => index.insert(&doc.id, vector)?,
                Err(e) => {
                    skipped += 1;
                    warn!(id = %doc.id, error = %e, "document not embeddable, skipping");
                }
            }
        }
        debug!(indexed = index.len(), skipped, "fallback index built");
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add or replace one vector. The id must be a corpus document id so
    /// neighbors can be resolved back to text.
    pub fn insert(&self, id: &str, vector: Vec<f32>) -> RetrieveResult<()> {
        if vector.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let mut docs = self
            .docs
            .write()
            .map_err(|_| RetrievalError::Index("write lock poisoned".into()))?;
        match docs.iter_mut().find(|d| d.id == id) {
            Some(doc) => doc.vector = vector,
            None => docs.push(IndexedDoc {
                id: id.to_string(),
                vector,
            }),
        }
        Ok(())
    }

    /// The `k` nearest ids with scores in [0, 1], descending; ties break on
    /// ascending id.
    pub fn search(&self, query: &[f32], k: usize) -> RetrieveResult<Vec<(String, f32)>> {
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let docs = self
            .docs
            .read()
            .map_err(|_| RetrievalError::Index("read lock poisoned".into()))?;
        let mut scored: Vec<(String, f32)> = docs
            .iter()
            .map(|doc| (doc.id.clone(), similarity_score(query, &doc.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

/// Cosine similarity shifted into [0, 1]. Zero vectors carry no signal and
/// score at the 0.5 midpoint.
fn similarity_score(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.5;
    }
    let cosine = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}
