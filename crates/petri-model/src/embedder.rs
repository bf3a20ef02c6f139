//! Embedding provider trait and the hash-based baseline.

use crate::{ModelError, ModelResult};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Converts text to dense vectors for semantic similarity.
///
/// Implementations must be deterministic per instance: the fallback index is
/// built and queried with the same embedder, and reordering runs must not
/// change neighbor ranking.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> ModelResult<Vec<f32>>;

    /// Embed multiple texts. Default: one by one.
    async fn embed_batch(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// Model name/identifier.
    fn model_name(&self) -> &str;
}

/// Hash-based embedder.
///
/// Buckets words into a fixed-dimension space with several seeded hash
/// functions and a sign hash, then L2-normalizes. Not semantically rich, but
/// deterministic and dependency-free, which is enough for the fallback index
/// to rank a small corpus.
///
/// # Example
///
/// ```rust
/// use petri_model::{Embedder, HashEmbedder};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let embedder = HashEmbedder::new(128);
/// let vec = embedder.embed("amyloid aggregation").await.unwrap();
/// assert_eq!(vec.len(), 128);
/// # });
/// ```
pub struct HashEmbedder {
    dimension: usize,
    num_hashes: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            num_hashes: 4,
        }
    }

    /// Default dimension (256).
    pub fn default_dimension() -> Self {
        Self::new(256)
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() > 1)
            .map(|s| s.to_string())
            .collect()
    }

    fn bucket(&self, word: &str, seed: u64) -> usize {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        word.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimension
    }

    /// Sign hash (+1 or -1) so collisions cancel instead of piling up.
    fn sign(&self, word: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        (seed + 1000).hash(&mut hasher);
        word.hash(&mut hasher);
        if hasher.finish() % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::default_dimension()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> ModelResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ModelError::InvalidInput("empty text".to_string()));
        }

        let tokens = self.tokenize(text);
        if tokens.is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in &tokens {
            for seed in 0..self.num_hashes as u64 {
                let idx = self.bucket(token, seed);
                vector[idx] += self.sign(token, seed);
            }
        }

        let scale = 1.0 / ((tokens.len() * self.num_hashes) as f32).sqrt();
        for v in &mut vector {
            *v *= scale;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-bucket"
    }
}
