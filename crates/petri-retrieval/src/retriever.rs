//! The fan-out retriever.
//!
//! One retrieval call:
//! 1. rejects empty queries before any I/O;
//! 2. answers each target source from the cache when it can;
//! 3. fetches the rest concurrently, each under its own deadline, recording
//!    failures as warnings instead of propagating them;
//! 4. tops the pool up from the vector index when the live sources leave it
//!    short of `retrieval_k` (which covers the all-sources-failed case);
//! 5. merges, dedupes by `(source, id)`, sorts by descending score, and
//!    truncates to `retrieval_k`.

use crate::cache::EvidenceCache;
use crate::corpus::CorpusStore;
use crate::index::VectorIndex;
use crate::registry::SourceRegistry;
use crate::{RetrievalError, RetrieveResult};
use futures::future::join_all;
use petri_connectors::{Connector, ConnectorError};
use petri_core::config::PipelineConfig;
use petri_core::types::{EvidenceItem, RetrievalResult, Source};
use petri_model::Embedder;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Per-call counters the pipeline folds into its diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RetrievalStats {
    pub sources_queried: Vec<Source>,
    pub sources_failed: Vec<Source>,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Items the vector fallback contributed.
    pub fallback_items: usize,
}

/// The local fallback: embedder, prebuilt index, and the corpus that turns
/// neighbor ids back into text.
struct Fallback {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    corpus: Arc<dyn CorpusStore>,
}

enum Outcome {
    Hit(Vec<EvidenceItem>),
    Fetched(Vec<EvidenceItem>),
    Failed(ConnectorError),
}

/// Unified entry point for evidence retrieval.
pub struct Retriever {
    config: PipelineConfig,
    registry: SourceRegistry,
    cache: Arc<EvidenceCache>,
    fallback: Option<Fallback>,
}

impl Retriever {
    pub fn new(config: PipelineConfig, registry: SourceRegistry) -> Self {
        let cache = Arc::new(EvidenceCache::new(config.cache_ttl));
        Self {
            config,
            registry,
            cache,
            fallback: None,
        }
    }

    /// Swap in a shared or specially clocked cache.
    pub fn with_cache(mut self, cache: Arc<EvidenceCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Attach the vector fallback.
    pub fn with_fallback(
        mut self,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        corpus: Arc<dyn CorpusStore>,
    ) -> Self {
        self.fallback = Some(Fallback {
            embedder,
            index,
            corpus,
        });
        self
    }

    pub fn cache(&self) -> &EvidenceCache {
        &self.cache
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Retrieve over every registered source.
    pub async fn retrieve(&self, query: &str) -> RetrieveResult<RetrievalResult> {
        self.retrieve_filtered(query, None).await
    }

    /// Retrieve over the intersection of the registered sources and `only`.
    /// A filter narrows the registry; it can never widen it.
    pub async fn retrieve_filtered(
        &self,
        query: &str,
        only: Option<&[Source]>,
    ) -> RetrieveResult<RetrievalResult> {
        Ok(self.retrieve_detailed(query, only).await?.0)
    }

    /// Retrieval plus the per-call stats.
    pub async fn retrieve_detailed(
        &self,
        query: &str,
        only: Option<&[Source]>,
    ) -> RetrieveResult<(RetrievalResult, RetrievalStats)> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::InvalidQuery);
        }
        let k = self.config.retrieval_k;
        if k == 0 {
            return Ok((RetrievalResult::default(), RetrievalStats::default()));
        }

        let targets: Vec<(Source, Arc<dyn Connector>)> = self
            .registry
            .iter()
            .filter(|(source, _)| only.map_or(true, |f| f.contains(source)))
            .collect();

        let mut stats = RetrievalStats {
            sources_queried: targets.iter().map(|(s, _)| *s).collect(),
            ..RetrievalStats::default()
        };

        let limit = self.config.per_source_limit;
        let deadline = self.config.request_timeout;
        let cache = &self.cache;

        let fetches = targets.iter().map(|(source, connector)| {
            let source = *source;
            let connector = Arc::clone(connector);
            async move {
                if let Some(items) = cache.get(source, query) {
                    debug!(source = %source, items = items.len(), "cache hit");
                    return (source, Outcome::Hit(items));
                }
                match timeout(deadline, connector.fetch(query, limit)).await {
                    Ok(Ok(items)) => {
                        cache.put(source, query, items.clone());
                        debug!(source = %source, items = items.len(), "fetched");
                        (source, Outcome::Fetched(items))
                    }
                    Ok(Err(e)) => (source, Outcome::Failed(e)),
                    Err(_) => (
                        source,
                        Outcome::Failed(ConnectorError::Timeout(deadline.as_secs())),
                    ),
                }
            }
        });
        let outcomes = join_all(fetches).await;

        let mut pool: Vec<EvidenceItem> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        for (source, outcome) in outcomes {
            match outcome {
                Outcome::Hit(items) => {
                    stats.cache_hits += 1;
                    pool.extend(items);
                }
                Outcome::Fetched(items) => {
                    stats.cache_misses += 1;
                    pool.extend(items);
                }
                Outcome::Failed(e) => {
                    stats.cache_misses += 1;
                    warn!(source = %source, kind = e.kind(), error = %e, "source failed");
                    warnings.push(format!("{} failed: {}", source, e));
                    stats.sources_failed.push(source);
                }
            }
        }

        // The fallback fills the remainder whenever the live sources left the
        // pool short of k; an empty pool (every source failed, or none were
        // registered) is the degenerate case of that.
        if pool.len() < k {
            if let Some(fallback) = &self.fallback {
                let want = (k - pool.len()).min(self.config.fallback_k);
                match self.query_fallback(fallback, query, want).await {
                    Ok(items) => {
                        stats.fallback_items = items.len();
                        if !items.is_empty() {
                            warnings.push(format!("vector fallback served {} items", items.len()));
                        }
                        pool.extend(items);
                    }
                    Err(e) => {
                        warn!(error = %e, "vector fallback failed");
                        warnings.push(format!("vector fallback failed: {}", e));
                    }
                }
            }
        }

        let degraded = !stats.sources_failed.is_empty() || stats.fallback_items > 0;
        let result = RetrievalResult {
            items: merge_ranked(pool, k),
            degraded,
            warnings,
        };
        Ok((result, stats))
    }

    async fn query_fallback(
        &self,
        fallback: &Fallback,
        query: &str,
        want: usize,
    ) -> RetrieveResult<Vec<EvidenceItem>> {
        let vector = fallback
            .embedder
            .embed(query)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        let neighbors = fallback.index.search(&vector, want)?;

        let mut items = Vec::with_capacity(neighbors.len());
        for (id, score) in neighbors {
            match fallback.corpus.resolve(&id) {
                Some(doc) => {
                    let mut item =
                        EvidenceItem::new(Source::VectorFallback, doc.id, doc.text, score as f64);
                    if let Some(url) = doc.url {
                        item = item.with_url(url);
                    }
                    items.push(item);
                }
                None => warn!(id = %id, "indexed id missing from corpus"),
            }
        }
        Ok(items)
    }
}

/// Deduplicate by `(source, id)` keeping the highest score, sort by
/// descending score with ascending id as the tie-break, truncate to `k`.
pub fn merge_ranked(items: Vec<EvidenceItem>, k: usize) -> Vec<EvidenceItem> {
    let mut best: HashMap<(Source, String), EvidenceItem> = HashMap::new();
    for item in items {
        let key = (item.source, item.id.clone());
        match best.get(&key) {
            Some(existing) if existing.score >= item.score => {}
            _ => {
                best.insert(key, item);
            }
        }
    }
    let mut merged: Vec<EvidenceItem> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(k);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusDocument, JsonlCorpus};
    use petri_connectors::{ConnectorResult, MockConnector};
    use petri_model::HashEmbedder;
    use std::time::Duration;

    fn item(source: Source, id: &str, score: f64) -> EvidenceItem {
        EvidenceItem::new(source, id, format!("passage {id}"), score)
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    async fn fallback_fixture(texts: &[(&str, &str)]) -> (Arc<HashEmbedder>, Arc<VectorIndex>, Arc<JsonlCorpus>) {
        let corpus = Arc::new(JsonlCorpus::from_documents(
            texts
                .iter()
                .map(|(id, text)| CorpusDocument::new(*id, *text))
                .collect(),
        ));
        let embedder = Arc::new(HashEmbedder::new(64));
        let index = Arc::new(
            VectorIndex::build_from_corpus(embedder.as_ref(), corpus.as_ref())
                .await
                .unwrap(),
        );
        (embedder, index, corpus)
    }

    #[test]
    fn merge_keeps_highest_score_per_identity() {
        let merged = merge_ranked(
            vec![
                item(Source::Pubmed, "1", 0.4),
                item(Source::Pubmed, "1", 0.9),
                item(Source::Uniprot, "1", 0.5),
            ],
            10,
        );
        assert_eq!(merged.len(), 2);
        let pubmed = merged.iter().find(|i| i.source == Source::Pubmed).unwrap();
        assert_eq!(pubmed.score, 0.9);
    }

    #[test]
    fn merge_sorts_descending_with_id_tiebreak() {
        let merged = merge_ranked(
            vec![
                item(Source::Pubmed, "b", 0.7),
                item(Source::Pubmed, "a", 0.7),
                item(Source::Uniprot, "c", 0.9),
            ],
            10,
        );
        let ids: Vec<&str> = merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn merge_truncates_to_k() {
        let items: Vec<_> = (0..10)
            .map(|i| item(Source::Pubmed, &format!("{i:02}"), 0.5))
            .collect();
        assert_eq!(merge_ranked(items, 3).len(), 3);
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_io() {
        let mock = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[("1", "text")]));
        let registry = SourceRegistry::new().with_connector(mock.clone());
        let retriever = Retriever::new(config(), registry);

        let err = retriever.retrieve("   ").await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQuery));
        assert_eq!(mock.fetch_calls(), 0);
        assert_eq!(retriever.cache().stats(), (0, 0));
    }

    #[tokio::test]
    async fn zero_k_returns_empty_without_touching_sources() {
        let mock = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[("1", "text")]));
        let registry = SourceRegistry::new().with_connector(mock.clone());
        let retriever = Retriever::new(config().with_retrieval_k(0), registry);

        let result = retriever.retrieve("brca1").await.unwrap();
        assert!(result.is_empty());
        assert!(!result.degraded);
        assert_eq!(mock.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn merges_across_sources_sorted_by_score() {
        let pubmed = Arc::new(
            MockConnector::new(Source::Pubmed)
                .with_item(item(Source::Pubmed, "101", 0.8))
                .with_item(item(Source::Pubmed, "102", 0.6)),
        );
        let uniprot =
            Arc::new(MockConnector::new(Source::Uniprot).with_item(item(Source::Uniprot, "P1", 0.9)));
        let registry = SourceRegistry::new()
            .with_connector(pubmed)
            .with_connector(uniprot);
        let retriever = Retriever::new(config(), registry);

        let result = retriever.retrieve("tp53").await.unwrap();
        assert!(!result.degraded);
        assert!(result.warnings.is_empty());
        let ids: Vec<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "101", "102"]);
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let mock = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[("1", "text")]));
        let registry = SourceRegistry::new().with_connector(mock.clone());
        let retriever = Retriever::new(config(), registry);

        retriever.retrieve("brca1 repair").await.unwrap();
        // Key normalization makes the reworded query hit the same entry.
        let (result, stats) = retriever
            .retrieve_detailed("BRCA1  repair", None)
            .await
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(mock.fetch_calls(), 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 0);
    }

    #[tokio::test]
    async fn failed_source_degrades_but_does_not_abort() {
        let ok = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[("1", "text")]));
        let broken = Arc::new(MockConnector::failing(
            Source::Uniprot,
            ConnectorError::Unavailable("connection refused".into()),
        ));
        let registry = SourceRegistry::new().with_connector(ok).with_connector(broken);
        let retriever = Retriever::new(config(), registry);

        let (result, stats) = retriever.retrieve_detailed("tp53", None).await.unwrap();
        assert!(result.degraded);
        assert_eq!(result.items.len(), 1);
        assert_eq!(stats.sources_failed, vec![Source::Uniprot]);
        assert!(result.warnings.iter().any(|w| w.contains("uniprot")));
    }

    #[tokio::test]
    async fn all_sources_failing_falls_back_to_vector_index() {
        let broken = Arc::new(MockConnector::failing(
            Source::Pubmed,
            ConnectorError::Unavailable("down".into()),
        ));
        let registry = SourceRegistry::new().with_connector(broken);
        let (embedder, index, corpus) = fallback_fixture(&[
            ("doc-1", "tp53 tumor suppressor pathway"),
            ("doc-2", "gut microbiome composition"),
        ])
        .await;

        let retriever =
            Retriever::new(config(), registry).with_fallback(embedder, index, corpus);

        let result = retriever.retrieve("tp53 tumor suppressor").await.unwrap();
        assert!(result.degraded);
        assert!(!result.is_empty());
        assert!(result
            .items
            .iter()
            .all(|i| i.source == Source::VectorFallback));
        assert_eq!(result.items[0].id, "doc-1");
    }

    #[tokio::test]
    async fn empty_live_results_also_trigger_fallback() {
        // The connector succeeds but has nothing to say.
        let empty = Arc::new(MockConnector::new(Source::Pubmed));
        let registry = SourceRegistry::new().with_connector(empty);
        let (embedder, index, corpus) =
            fallback_fixture(&[("doc-1", "tp53 tumor suppressor pathway")]).await;

        let retriever =
            Retriever::new(config(), registry).with_fallback(embedder, index, corpus);

        let (result, stats) = retriever
            .retrieve_detailed("tp53 pathway", None)
            .await
            .unwrap();
        assert!(result.degraded);
        assert!(stats.sources_failed.is_empty());
        assert_eq!(stats.fallback_items, 1);
        assert_eq!(result.items[0].source, Source::VectorFallback);
    }

    #[tokio::test]
    async fn short_live_pool_is_topped_up_by_fallback() {
        let pubmed = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[("101", "live passage")]));
        let registry = SourceRegistry::new().with_connector(pubmed);
        let (embedder, index, corpus) = fallback_fixture(&[
            ("doc-1", "amyloid aggregation in neurons"),
            ("doc-2", "tau protein phosphorylation"),
        ])
        .await;

        let retriever = Retriever::new(config().with_retrieval_k(3), registry)
            .with_fallback(embedder, index, corpus);

        let (result, stats) = retriever
            .retrieve_detailed("amyloid aggregation", None)
            .await
            .unwrap();

        // One live item plus two fallback neighbors fill k=3.
        assert_eq!(result.items.len(), 3);
        assert!(result.degraded);
        assert!(stats.sources_failed.is_empty());
        assert_eq!(stats.fallback_items, 2);
        assert!(result.sources().contains(&Source::Pubmed));
        assert!(result.sources().contains(&Source::VectorFallback));
    }

    #[tokio::test]
    async fn full_live_pool_never_invokes_fallback() {
        let pubmed = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[("101", "live passage")]));
        let registry = SourceRegistry::new().with_connector(pubmed);
        let (embedder, index, corpus) =
            fallback_fixture(&[("doc-1", "amyloid aggregation in neurons")]).await;

        let retriever = Retriever::new(config().with_retrieval_k(1), registry)
            .with_fallback(embedder, index, corpus);

        let (result, stats) = retriever
            .retrieve_detailed("amyloid aggregation", None)
            .await
            .unwrap();

        assert!(!result.degraded);
        assert_eq!(stats.fallback_items, 0);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].source, Source::Pubmed);
    }

    #[tokio::test]
    async fn source_filter_narrows_but_cannot_widen() {
        let pubmed = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[("1", "a")]));
        let uniprot = Arc::new(MockConnector::new(Source::Uniprot).with_passages(&[("P1", "b")]));
        let registry = SourceRegistry::new()
            .with_connector(pubmed.clone())
            .with_connector(uniprot.clone());
        let retriever = Retriever::new(config(), registry);

        // Drugbank is not registered; naming it in the filter conjures nothing.
        let result = retriever
            .retrieve_filtered("tp53", Some(&[Source::Pubmed, Source::Drugbank]))
            .await
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].source, Source::Pubmed);
        assert_eq!(pubmed.fetch_calls(), 1);
        assert_eq!(uniprot.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn per_source_limit_is_passed_to_connectors() {
        let mock = Arc::new(MockConnector::new(Source::Pubmed).with_passages(&[
            ("1", "a"),
            ("2", "b"),
            ("3", "c"),
        ]));
        let registry = SourceRegistry::new().with_connector(mock);
        let retriever = Retriever::new(config().with_per_source_limit(2), registry);

        let result = retriever.retrieve("q").await.unwrap();
        assert_eq!(result.items.len(), 2);
    }

    struct SlowConnector;

    #[async_trait::async_trait]
    impl Connector for SlowConnector {
        fn source(&self) -> Source {
            Source::Pubmed
        }

        async fn fetch(&self, _query: &str, _limit: usize) -> ConnectorResult<Vec<EvidenceItem>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn fetch_by_id(&self, _id: &str) -> ConnectorResult<EvidenceItem> {
            Err(ConnectorError::Unavailable("slow".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out_and_degrades() {
        let registry = SourceRegistry::new().with_connector(Arc::new(SlowConnector));
        let retriever = Retriever::new(config(), registry);

        let (result, stats) = retriever.retrieve_detailed("tp53", None).await.unwrap();
        assert!(result.degraded);
        assert!(result.is_empty());
        assert_eq!(stats.sources_failed, vec![Source::Pubmed]);
        assert!(result.warnings[0].contains("Timeout"));
    }
}
