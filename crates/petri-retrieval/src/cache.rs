//! TTL cache for connector results.
//!
//! Keys are `(source, normalized query)`. Entries are served while their
//! deadline is in the future and evicted lazily on access; nothing ticks in
//! the background. Time comes from an injected [`Clock`] so expiry is
//! testable without sleeping.

use petri_core::types::{EvidenceItem, Source};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Monotonic time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock advanced by hand, for deterministic expiry tests.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        match self.now.lock() {
            Ok(mut guard) => *guard += by,
            Err(poisoned) => *poisoned.into_inner() += by,
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

struct CacheEntry {
    items: Vec<EvidenceItem>,
    expires_at: Instant,
}

/// Query cache shared across concurrent fan-out tasks.
///
/// `get` and `put` take `&self`; the cache is best-effort, so a poisoned
/// lock downgrades to a miss instead of a panic.
pub struct EvidenceCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EvidenceCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            clock,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// A fresh entry for the key, or `None` on miss or expiry. Expired
    /// entries are evicted on the way out.
    pub fn get(&self, source: Source, query: &str) -> Option<Vec<EvidenceItem>> {
        let key = cache_key(source, query);
        let now = self.clock.now();

        // Fast path under the read lock.
        let expired = match self.entries.read() {
            Ok(entries) => match entries.get(&key) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.items.clone());
                }
                Some(_) => true,
                None => false,
            },
            Err(_) => false,
        };

        if expired {
            if let Ok(mut entries) = self.entries.write() {
                // Another task may have refreshed the entry in between.
                match entries.get(&key) {
                    Some(entry) if entry.expires_at > now => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return Some(entry.items.clone());
                    }
                    Some(_) => {
                        entries.remove(&key);
                        debug!(key = %key, "evicted expired cache entry");
                    }
                    None => {}
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store items for the key, replacing any previous entry and restarting
    /// its TTL.
    pub fn put(&self, source: Source, query: &str, items: Vec<EvidenceItem>) {
        let entry = CacheEntry {
            items,
            expires_at: self.clock.now() + self.ttl,
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(cache_key(source, query), entry);
        }
    }

    /// Cumulative `(hits, misses)`.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Stored entry count, expired entries included until they are evicted.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source tag plus the lowercased, whitespace-collapsed query.
fn cache_key(source: Source, query: &str) -> String {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    format!("{}:{}", source.as_str(), normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> EvidenceItem {
        EvidenceItem::new(Source::Pubmed, id, "passage", 0.9)
    }

    #[test]
    fn serves_fresh_entries_and_expires_old_ones() {
        let clock = Arc::new(ManualClock::new());
        let cache = EvidenceCache::with_clock(Duration::from_secs(300), clock.clone());

        cache.put(Source::Pubmed, "brca1 repair", vec![item("1")]);
        assert_eq!(cache.get(Source::Pubmed, "brca1 repair").unwrap().len(), 1);

        clock.advance(Duration::from_secs(299));
        assert!(cache.get(Source::Pubmed, "brca1 repair").is_some());

        clock.advance(Duration::from_secs(2));
        assert!(cache.get(Source::Pubmed, "brca1 repair").is_none());
        assert_eq!(cache.stats(), (2, 1));
    }

    #[test]
    fn expired_entries_are_evicted_on_access() {
        let clock = Arc::new(ManualClock::new());
        let cache = EvidenceCache::with_clock(Duration::from_secs(10), clock.clone());

        cache.put(Source::Uniprot, "p53", vec![item("P04637")]);
        clock.advance(Duration::from_secs(11));

        assert!(cache.get(Source::Uniprot, "p53").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn replacement_restarts_the_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = EvidenceCache::with_clock(Duration::from_secs(10), clock.clone());

        cache.put(Source::Pubmed, "q", vec![item("1")]);
        clock.advance(Duration::from_secs(8));
        cache.put(Source::Pubmed, "q", vec![item("2")]);
        clock.advance(Duration::from_secs(8));

        let items = cache.get(Source::Pubmed, "q").unwrap();
        assert_eq!(items[0].id, "2");
    }

    #[test]
    fn keys_are_source_scoped_and_normalized() {
        let cache = EvidenceCache::new(Duration::from_secs(60));
        cache.put(Source::Pubmed, "  TP53   Binding ", vec![item("1")]);

        assert!(cache.get(Source::Pubmed, "tp53 binding").is_some());
        assert!(cache.get(Source::Uniprot, "tp53 binding").is_none());
    }
}
