//! Expansion result caching.
//!
//! Provides an LRU cache with TTL expiration for expansion results, keyed by
//! namespace and normalized term. Thread-safe using `Mutex` for LRU
//! operations.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::config::CacheConfig;
use crate::namespace::Namespace;
use crate::query::{classify_term, TermKind};
use crate::traits::OntologyTerm;

/// Cache key: the resolved namespace plus the normalized input term.
pub type ExpansionKey = (Namespace, String);

#[derive(Debug, Clone)]
struct CacheEntry {
    terms: Vec<OntologyTerm>,
    created_at: Instant,
}

impl CacheEntry {
    fn new(terms: Vec<OntologyTerm>) -> Self {
        Self {
            terms,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Thread-safe LRU cache with TTL expiration for expansion results.
///
/// # Example
///
/// ```rust
/// use cxg_ontology::{CacheConfig, ExpansionCache, Namespace, OntologyTerm};
///
/// let cache = ExpansionCache::new(CacheConfig::default());
/// let key = ExpansionCache::key(Namespace::Cl, "Neuron");
/// cache.set(key.clone(), vec![OntologyTerm::new("CL:0000540", "neuron")]);
///
/// // Labels are matched case-insensitively, so keys are too.
/// assert!(cache.get(&ExpansionCache::key(Namespace::Cl, "neuron")).is_some());
/// ```
pub struct ExpansionCache {
    inner: Mutex<LruCache<ExpansionKey, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ExpansionCache {
    /// Creates a new cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_capacity(config.max_entries, config.ttl)
    }

    /// Creates a cache with custom capacity and TTL.
    pub fn with_capacity(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Builds the cache key for `term` in `namespace`.
    pub fn key(namespace: Namespace, term: &str) -> ExpansionKey {
        (namespace, normalize_term(term))
    }

    /// Gets a cached expansion, or `None` if absent or expired.
    ///
    /// On hit, the entry is promoted to most-recently-used.
    pub fn get(&self, key: &ExpansionKey) -> Option<Vec<OntologyTerm>> {
        let found = self.inner.lock().ok().and_then(|mut cache| {
            let expired = cache.get(key)?.is_expired(self.ttl);
            if expired {
                cache.pop(key);
                None
            } else {
                cache.get(key).map(|entry| entry.terms.clone())
            }
        });

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores an expansion, evicting the least recently used entry if full.
    pub fn set(&self, key: ExpansionKey, terms: Vec<OntologyTerm>) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, CacheEntry::new(terms));
        }
    }

    /// Returns the number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all entries. Hit and miss counters are kept.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.clear();
        }
    }

    /// Removes expired entries.
    pub fn cleanup_expired(&self) {
        if let Ok(mut cache) = self.inner.lock() {
            let ttl = self.ttl;
            let expired: Vec<ExpansionKey> = cache
                .iter()
                .filter(|(_, entry)| entry.is_expired(ttl))
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                cache.pop(&key);
            }
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (total, expired) = match self.inner.lock() {
            Ok(cache) => (
                cache.len(),
                cache
                    .iter()
                    .filter(|(_, entry)| entry.is_expired(self.ttl))
                    .count(),
            ),
            Err(_) => (0, 0),
        };

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ExpansionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("ExpansionCache")
            .field("entries", &stats.total_entries)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Statistics about the cache state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of entries in the cache.
    pub total_entries: usize,
    /// Number of expired entries (not yet cleaned up).
    pub expired_entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed or found an expired entry.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Normalizes a term for use as a cache key.
///
/// The key must identify exactly the query that will be sent. IDs are kept
/// as written; labels are only lowercased, since the label lookup compares
/// with `LCASE` but sees whitespace verbatim.
pub fn normalize_term(term: &str) -> String {
    match classify_term(term) {
        TermKind::Id(_) => term.to_string(),
        TermKind::Label => term.to_lowercase(),
    }
}
