//! SQLite-backed corpus store.
//!
//! Keeps fallback documents in a single table so a corpus can outlive the
//! process and be shared between tools. Reads go through the same
//! [`CorpusStore`] trait as the in-memory JSONL store.

use crate::corpus::{CorpusDocument, CorpusStore};
use crate::{RetrievalError, RetrieveResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

pub struct SqliteCorpus {
    conn: Mutex<Connection>,
}

impl SqliteCorpus {
    /// Create or open a file-backed corpus.
    pub fn open(path: impl AsRef<Path>) -> RetrieveResult<Self> {
        let conn = Connection::open(path).map_err(sql_err)?;
        Self::init(conn)
    }

    /// A fresh in-memory corpus.
    pub fn in_memory() -> RetrieveResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> RetrieveResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id   TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                url  TEXT
            );",
        )
        .map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace one document.
    pub fn insert(&self, doc: &CorpusDocument) -> RetrieveResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RetrievalError::CorpusLoad("connection lock poisoned".into()))?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (id, text, url) VALUES (?1, ?2, ?3)",
            params![doc.id, doc.text, doc.url],
        )
        .map_err(sql_err)?;
        Ok(())
    }
}

fn sql_err(e: rusqlite::Error) -> RetrievalError {
    RetrievalError::CorpusLoad(e.to_string())
}

fn row_to_doc(row: &rusqlite::Row<'_>) -> rusqlite::Result<CorpusDocument> {
    Ok(CorpusDocument {
        id: row.get(0)?,
        text: row.get(1)?,
        url: row.get(2)?,
    })
}

impl CorpusStore for SqliteCorpus {
    fn resolve(&self, id: &str) -> Option<CorpusDocument> {
        let conn = self.conn.lock().ok()?;
        conn.query_row(
            "SELECT id, text, url FROM documents WHERE id = ?1",
            params![id],
            row_to_doc,
        )
        .ok()
    }

    fn all(&self) -> Vec<CorpusDocument> {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => {
                warn!("corpus connection lock poisoned");
                return Vec::new();
            }
        };
        let mut stmt = match conn.prepare("SELECT id, text, url FROM documents ORDER BY id") {
            Ok(stmt) => stmt,
            Err(e) => {
                warn!(error = %e, "corpus scan failed");
                return Vec::new();
            }
        };
        match stmt.query_map([], row_to_doc) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                warn!(error = %e, "corpus scan failed");
                Vec::new()
            }
        }
    }

    fn len(&self) -> usize {
        self.conn
            .lock()
            .ok()
            .and_then(|conn| {
                conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
                    .ok()
            })
            .unwrap_or(0)
    }
}
