//! The set of connectors one retrieval call may touch.

use petri_connectors::{create_connector, Connector, ConnectorResult};
use petri_core::config::PipelineConfig;
use petri_core::types::Source;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Holds one connector per enabled live source.
///
/// Disabled sources are absent rather than flagged: a retrieval call cannot
/// reach a connector that was never registered.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    connectors: BTreeMap<Source, Arc<dyn Connector>>,
}

impl SourceRegistry {
    /// An empty registry, to be filled with [`with_connector`].
    ///
    /// [`with_connector`]: SourceRegistry::with_connector
    pub fn new() -> Self {
        Self::default()
    }

    /// Build connectors for every source the config enables.
    pub fn from_config(config: &PipelineConfig) -> ConnectorResult<Self> {
        let mut registry = Self::new();
        for source in config.enabled_sources() {
            let connector = create_connector(source, config)?;
            debug!(source = %source, "registered connector");
            registry.connectors.insert(source, connector);
        }
        Ok(registry)
    }

    /// Register a connector under the source it reports, replacing any
    /// previous one for that source.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connectors.insert(connector.source(), connector);
        self
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&source).cloned()
    }

    pub fn contains(&self, source: Source) -> bool {
        self.connectors.contains_key(&source)
    }

    /// Registered sources in stable order.
    pub fn sources(&self) -> Vec<Source> {
        self.connectors.keys().copied().collect()
    }

    /// `(source, connector)` pairs in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Source, Arc<dyn Connector>)> + '_ {
        self.connectors.iter().map(|(s, c)| (*s, Arc::clone(c)))
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
