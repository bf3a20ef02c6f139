//! Scripted connector for tests and offline runs.

use crate::{Connector, ConnectorError, ConnectorResult};
use async_trait::async_trait;
use petri_core::types::{EvidenceItem, Source};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A connector that serves canned items or a canned failure, counting calls.
///
/// Call counts let tests assert that disabled sources and rejected queries
/// never touched a connector.
pub struct MockConnector {
    source: Source,
    items: Vec<EvidenceItem>,
    fail_with: Option<ConnectorError>,
    fetch_calls: AtomicUsize,
}

impl MockConnector {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            items: Vec::new(),
            fail_with: None,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Add one canned item, in serving order.
    pub fn with_item(mut self, item: EvidenceItem) -> Self {
        self.items.push(item);
        self
    }

    /// Convenience: add passages as `(id, text)` pairs at full score.
    pub fn with_passages(mut self, passages: &[(&str, &str)]) -> Self {
        for (id, text) in passages {
            self.items
                .push(EvidenceItem::new(self.source, *id, *text, 1.0));
        }
        self
    }

    /// Make every call fail with the given error.
    pub fn failing(source: Source, error: ConnectorError) -> Self {
        Self {
            source,
            items: Vec::new(),
            fail_with: Some(error),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch` calls so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, _query: &str, limit: usize) -> ConnectorResult<Vec<EvidenceItem>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        Ok(self.items.iter().take(limit).cloned().collect())
    }

    async fn fetch_by_id(&self, id: &str) -> ConnectorResult<EvidenceItem> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        self.items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| ConnectorError::Unavailable(format!("no record for id {}", id)))
    }
}
