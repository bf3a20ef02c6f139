//! Pipeline configuration.
//!
//! One immutable [`PipelineConfig`] is resolved at startup and threaded
//! explicitly through coordinator, retriever, and connectors. There is no
//! hot reload and no process-wide mutable configuration state.

use crate::types::Source;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Enable flag for one live source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: Source,
    pub enabled: bool,
}

impl SourceConfig {
    pub fn new(source: Source, enabled: bool) -> Self {
        Self { source, enabled }
    }
}

/// Tunable parameters for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-source enable flags (default: pubmed and uniprot on, drugbank off).
    pub sources: Vec<SourceConfig>,
    /// TTL applied to every cached connector result (default: 300 s).
    pub cache_ttl: Duration,
    /// Evidence items requested per retrieval call (default: 20).
    pub retrieval_k: usize,
    /// Items requested from each individual connector (default: 7).
    pub per_source_limit: usize,
    /// Neighbors requested from the vector fallback index (default: 10).
    pub fallback_k: usize,
    /// Minimum interval between consecutive requests to one source (default: 100 ms).
    pub min_request_interval: Duration,
    /// Deadline for one connector, index, or model call (default: 10 s).
    pub request_timeout: Duration,
    /// Character budget for the synthesis prompt context (default: 4000).
    pub context_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig::new(Source::Pubmed, true),
                SourceConfig::new(Source::Uniprot, true),
                SourceConfig::new(Source::Drugbank, false),
            ],
            cache_ttl: Duration::from_secs(300),
            retrieval_k: 20,
            per_source_limit: 7,
            fallback_k: 10,
            min_request_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(10),
            context_budget: 4000,
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// Recognized: `PETRI_ENABLE_PUBMED`, `PETRI_ENABLE_UNIPROT`,
    /// `PETRI_ENABLE_DRUGBANK` (true/false/1/0), `PETRI_CACHE_TTL_SECS`,
    /// `PETRI_RETRIEVAL_K`, `PETRI_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_bool("PETRI_ENABLE_PUBMED") {
            config = config.with_source_enabled(Source::Pubmed, v);
        }
        if let Some(v) = env_bool("PETRI_ENABLE_UNIPROT") {
            config = config.with_source_enabled(Source::Uniprot, v);
        }
        if let Some(v) = env_bool("PETRI_ENABLE_DRUGBANK") {
            config = config.with_source_enabled(Source::Drugbank, v);
        }
        if let Some(secs) = env_u64("PETRI_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(k) = env_u64("PETRI_RETRIEVAL_K") {
            config.retrieval_k = k as usize;
        }
        if let Some(secs) = env_u64("PETRI_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Enable or disable one source, replacing an existing flag.
    pub fn with_source_enabled(mut self, source: Source, enabled: bool) -> Self {
        if let Some(entry) = self.sources.iter_mut().find(|s| s.source == source) {
            entry.enabled = enabled;
        } else {
            self.sources.push(SourceConfig::new(source, enabled));
        }
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub fn with_per_source_limit(mut self, limit: usize) -> Self {
        self.per_source_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Whether a live source is enabled; non-live sources are never enabled
    /// through the registry.
    pub fn is_enabled(&self, source: Source) -> bool {
        source.is_live()
            && self
                .sources
                .iter()
                .any(|s| s.source == source && s.enabled)
    }

    /// The enabled live sources, in declaration order.
    pub fn enabled_sources(&self) -> Vec<Source> {
        self.sources
            .iter()
            .filter(|s| s.enabled && s.source.is_live())
            .map(|s| s.source)
            .collect()
    }
}

fn env_bool(key: &str) -> Option<bool> {
    match std::env::var(key).ok()?.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_policy() {
        let config = PipelineConfig::default();
        assert!(config.is_enabled(Source::Pubmed));
        assert!(config.is_enabled(Source::Uniprot));
        assert!(!config.is_enabled(Source::Drugbank));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.per_source_limit, 7);
        assert_eq!(config.retrieval_k, 20);
    }

    #[test]
    fn with_source_enabled_replaces_flag() {
        let config = PipelineConfig::default().with_source_enabled(Source::Drugbank, true);
        assert!(config.is_enabled(Source::Drugbank));
        assert_eq!(config.sources.len(), 3);
        assert_eq!(
            config.enabled_sources(),
            vec![Source::Pubmed, Source::Uniprot, Source::Drugbank]
        );
    }

    #[test]
    fn non_live_sources_are_never_enabled() {
        let config = PipelineConfig::default().with_source_enabled(Source::Upload, true);
        assert!(!config.enabled_sources().contains(&Source::Upload));
    }
}
