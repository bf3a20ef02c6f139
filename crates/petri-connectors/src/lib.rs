//! # Petri Connectors
//!
//! Adapters to the live biomedical data sources. Every source sits behind the
//! same [`Connector`] capability trait: fetch passages for a query, fetch one
//! record by id. Connectors are stateless between calls, enforce their own
//! minimum-interval rate limit, and map transport failures into the
//! [`ConnectorError`] taxonomy so the retriever can degrade instead of
//! propagating wire errors.
//!
//! ## Backends
//!
//! | Source   | Implementation | Feature |
//! |----------|----------------|---------|
//! | PubMed   | NCBI E-utilities (esearch + efetch XML) | `http` |
//! | UniProt  | UniProt REST (TSV) | `http` |
//! | DrugBank | deterministic mock records; public query endpoint with an API key | mock always, live behind `http` |
//!
//! [`MockConnector`] is always available for tests and offline runs.
//!
//! ## Example
//!
//! ```rust
//! use petri_connectors::{Connector, MockConnector};
//! use petri_core::types::{EvidenceItem, Source};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let connector = MockConnector::new(Source::Pubmed)
//!     .with_item(EvidenceItem::new(Source::Pubmed, "31452104", "Amyloid ...", 1.0));
//! let items = connector.fetch("amyloid", 5).await.unwrap();
//! assert_eq!(items.len(), 1);
//! # });
//! ```

pub mod limiter;
pub mod mock;

#[cfg(feature = "http")]
pub(crate) mod http_util;
#[cfg(feature = "http")]
pub mod pubmed;
#[cfg(feature = "http")]
pub mod uniprot;

pub mod drugbank;

pub use drugbank::DrugbankConnector;
pub use limiter::RateLimiter;
pub use mock::MockConnector;
#[cfg(feature = "http")]
pub use pubmed::PubmedConnector;
#[cfg(feature = "http")]
pub use uniprot::UniprotConnector;

use async_trait::async_trait;
use petri_core::config::PipelineConfig;
use petri_core::types::{EvidenceItem, Source};
use std::sync::Arc;
use thiserror::Error;

/// Connector failure taxonomy. The retriever absorbs these into warnings and
/// a degraded flag; they never reach the pipeline caller raw.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl ConnectorError {
    /// Short kind tag for warnings and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::RateLimited(_) => "rate_limited",
            ConnectorError::Unavailable(_) => "unavailable",
            ConnectorError::Malformed(_) => "malformed",
            ConnectorError::Timeout(_) => "timeout",
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// One external biomedical data source.
///
/// Implementations are `Send + Sync` so the retriever can fan out over them
/// concurrently behind `Arc`s.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The source this connector serves.
    fn source(&self) -> Source;

    /// Fetch up to `limit` evidence passages for a query.
    async fn fetch(&self, query: &str, limit: usize) -> ConnectorResult<Vec<EvidenceItem>>;

    /// Fetch one record by its source-qualified id.
    async fn fetch_by_id(&self, id: &str) -> ConnectorResult<EvidenceItem>;
}

/// Build the connector for a live source.
///
/// DrugBank always resolves (its keyless mode serves deterministic records);
/// PubMed and UniProt need the `http` feature.
pub fn create_connector(
    source: Source,
    config: &PipelineConfig,
) -> ConnectorResult<Arc<dyn Connector>> {
    match source {
        Source::Drugbank => Ok(Arc::new(DrugbankConnector::from_env(config)?)),
        #[cfg(feature = "http")]
        Source::Pubmed => Ok(Arc::new(PubmedConnector::new(config)?)),
        #[cfg(feature = "http")]
        Source::Uniprot => Ok(Arc::new(UniprotConnector::new(config)?)),
        #[cfg(not(feature = "http"))]
        Source::Pubmed | Source::Uniprot => Err(ConnectorError::Unavailable(format!(
            "{} connector requires the `http` feature",
            source
        ))),
        Source::VectorFallback | Source::Upload => Err(ConnectorError::Unavailable(format!(
            "{} is not a connector-backed source",
            source
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_match_variants() {
        assert_eq!(ConnectorError::Timeout(10).kind(), "timeout");
        assert_eq!(
            ConnectorError::Unavailable("down".into()).kind(),
            "unavailable"
        );
    }

    #[test]
    fn create_connector_rejects_internal_sources() {
        let config = PipelineConfig::default();
        assert!(create_connector(Source::VectorFallback, &config).is_err());
        assert!(create_connector(Source::Upload, &config).is_err());
    }

    #[test]
    fn drugbank_resolves_without_http_feature() {
        let config = PipelineConfig::default();
        let connector = create_connector(Source::Drugbank, &config).unwrap();
        assert_eq!(connector.source(), Source::Drugbank);
    }
}
