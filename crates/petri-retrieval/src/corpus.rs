//! Local corpus stores backing the vector fallback.
//!
//! The fallback index holds only ids and vectors; a [`CorpusStore`] resolves
//! neighbor ids back to the passages they came from.

use crate::{RetrievalError, RetrieveResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One locally held passage the fallback can serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl CorpusDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Read access to a document corpus. Implementations are synchronous; stores
/// are expected to be local (memory, file, embedded database).
pub trait CorpusStore: Send + Sync {
    /// The document with this id, if any.
    fn resolve(&self, id: &str) -> Option<CorpusDocument>;

    /// Every document, for index building.
    fn all(&self) -> Vec<CorpusDocument>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory corpus parsed from JSON Lines, one document per line.
#[derive(Debug)]
pub struct JsonlCorpus {
    docs: Vec<CorpusDocument>,
    by_id: HashMap<String, usize>,
}

impl JsonlCorpus {
    pub fn from_documents(docs: Vec<CorpusDocument>) -> Self {
        let mut corpus = Self {
            docs: Vec::new(),
            by_id: HashMap::new(),
        };
        for doc in docs {
            corpus.upsert(doc);
        }
        corpus
    }

    /// Parse one JSON document per non-empty line.
    pub fn parse(data: &str) -> RetrieveResult<Self> {
        let mut corpus = Self {
            docs: Vec::new(),
            by_id: HashMap::new(),
        };
        for (lineno, line) in data.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let doc: CorpusDocument = serde_json::from_str(line)
                .map_err(|e| RetrievalError::CorpusLoad(format!("line {}: {}", lineno + 1, e)))?;
            corpus.upsert(doc);
        }
        Ok(corpus)
    }

    pub fn from_path(path: impl AsRef<Path>) -> RetrieveResult<Self> {
        let data = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RetrievalError::CorpusLoad(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::parse(&data)
    }

    /// A later document with a known id replaces the earlier one.
    fn upsert(&mut self, doc: CorpusDocument) {
        match self.by_id.get(&doc.id) {
            Some(&idx) => self.docs[idx] = doc,
            None => {
                self.by_id.insert(doc.id.clone(), self.docs.len());
                self.docs.push(doc);
            }
        }
    }
}

impl CorpusStore for JsonlCorpus {
    fn resolve(&self, id: &str) -> Option<CorpusDocument> {
        self.by_id.get(id).map(|&idx| self.docs[idx].clone())
    }

    fn all(&self) -> Vec<CorpusDocument> {
        self.docs.clone()
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
{"id": "doc-1", "text": "Amyloid beta aggregation in Alzheimer disease.", "url": "https://example.org/doc-1"}
{"id": "doc-2", "text": "Tau phosphorylation and microtubule stability."}

{"id": "doc-1", "text": "Amyloid beta aggregation, revised passage."}
"#;

    #[test]
    fn parses_lines_and_keeps_last_duplicate() {
        let corpus = JsonlCorpus::parse(SAMPLE).unwrap();
        assert_eq!(corpus.len(), 2);
        let doc = corpus.resolve("doc-1").unwrap();
        assert!(doc.text.contains("revised"));
        // Replacement drops fields the later line does not carry.
        assert!(doc.url.is_none());
        assert!(corpus.resolve("doc-3").is_none());
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = JsonlCorpus::parse("{\"id\": \"a\", \"text\": \"ok\"}\nnot json").unwrap_err();
        match err {
            RetrievalError::CorpusLoad(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_path_is_a_load_error() {
        assert!(matches!(
            JsonlCorpus::from_path("/nonexistent/corpus.jsonl"),
            Err(RetrievalError::CorpusLoad(_))
        ));
    }
}
