//! Term inventory cache.
//!
//! Answers "which ontology IDs actually occur in census release V for
//! organism O in column C?". Lookups go memo, then durable file, then the
//! census backend. Inventories never expire; they are only dropped by
//! [`TermInventoryCache::clear`] / [`TermInventoryCache::clear_durable`] or
//! when a durable file turns out to be corrupt.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cxg_query_enhancer::{InMemoryCensus, TermInventoryCache};
//!
//! let census = InMemoryCensus::new(100).with_values(
//!     "2025-01-30",
//!     "homo_sapiens",
//!     "cell_type_ontology_term_id",
//!     ["CL:0000540", "unknown"],
//! );
//! let cache = TermInventoryCache::new(Arc::new(census));
//!
//! let kept = cache.filter_by_inventory(
//!     &["CL:0000540".to_string(), "CL:0000100".to_string()],
//!     "2025-01-30",
//!     "Homo sapiens",
//!     "cell_type_ontology_term_id",
//! );
//! assert_eq!(kept, vec!["CL:0000540".to_string()]);
//! ```

mod persistence;
mod types;

pub use persistence::{InventoryFile, InventoryStore, INVENTORY_EXTENSION};
pub use types::{census_organism, InventoryKey, InventoryStats};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::census::CensusBackend;
use crate::error::EnhancerResult;

/// Census values that never count as observed terms.
pub const SENTINEL_VALUES: &[&str] = &["unknown"];

/// Process-wide cache of census term inventories.
///
/// Shared by reference (`Arc`) between the coordinator and any other
/// caller. Concurrent misses on the same key fetch once; misses on
/// different keys fetch in parallel.
pub struct TermInventoryCache {
    backend: Arc<dyn CensusBackend>,
    store: Option<InventoryStore>,
    memo: RwLock<HashMap<InventoryKey, Arc<HashSet<String>>>>,
    fetch_locks: Mutex<HashMap<InventoryKey, Arc<Mutex<()>>>>,
    stats: RwLock<InventoryStats>,
}

impl TermInventoryCache {
    /// Creates a memory-only cache.
    pub fn new(backend: Arc<dyn CensusBackend>) -> Self {
        Self {
            backend,
            store: None,
            memo: RwLock::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
            stats: RwLock::new(InventoryStats::default()),
        }
    }

    /// Creates a cache that also persists inventories in `store`.
    pub fn with_store(backend: Arc<dyn CensusBackend>, store: InventoryStore) -> Self {
        Self {
            store: Some(store),
            ..Self::new(backend)
        }
    }

    /// Returns the inventory for `(version, organism, column)`.
    ///
    /// # Errors
    ///
    /// Fails only if the census backend fails; unusable durable files are
    /// logged and refetched.
    pub fn get_inventory(
        &self,
        version: &str,
        organism: &str,
        column: &str,
    ) -> EnhancerResult<Arc<HashSet<String>>> {
        let key = InventoryKey::new(version, organism, column);

        if let Some(hit) = self.memo_get(&key) {
            return Ok(hit);
        }

        let key_lock = self.fetch_lock(&key);
        let _fetching = key_lock.lock();
        // Another caller may have filled the memo while we waited.
        if let Some(hit) = self.memo_get(&key) {
            return Ok(hit);
        }

        let terms = match self.load_durable(&key) {
            Some(terms) => terms,
            None => {
                let terms = self.fetch(&key)?;
                self.persist(&key, &terms);
                terms
            }
        };

        let terms = Arc::new(terms);
        self.memo.write().insert(key, Arc::clone(&terms));
        Ok(terms)
    }

    /// Keeps the IDs that occur in the inventory, in input order.
    ///
    /// If the inventory cannot be obtained, the IDs are returned unfiltered.
    pub fn filter_by_inventory(
        &self,
        ids: &[String],
        version: &str,
        organism: &str,
        column: &str,
    ) -> Vec<String> {
        if ids.is_empty() {
            return Vec::new();
        }

        match self.get_inventory(version, organism, column) {
            Ok(inventory) => {
                let kept: Vec<String> = ids
                    .iter()
                    .filter(|id| inventory.contains(id.as_str()))
                    .cloned()
                    .collect();
                info!(
                    matched = kept.len(),
                    total = ids.len(),
                    column,
                    "IDs matched in census"
                );
                kept
            }
            Err(e) => {
                self.stats.write().unfiltered_fallbacks += 1;
                warn!(error = %e, column, "census terms unavailable, returning IDs unfiltered");
                ids.to_vec()
            }
        }
    }

    /// Drops every memoized inventory. Durable files are kept.
    pub fn clear(&self) {
        self.memo.write().clear();
    }

    /// Drops memoized inventories and deletes the durable files, returning
    /// the number of files removed.
    pub fn clear_durable(&self) -> EnhancerResult<usize> {
        self.clear();
        match &self.store {
            Some(store) => store.clear(),
            None => Ok(0),
        }
    }

    /// Number of memoized inventories.
    pub fn memo_len(&self) -> usize {
        self.memo.read().len()
    }

    /// Returns the durable store, if any.
    pub fn store(&self) -> Option<&InventoryStore> {
        self.store.as_ref()
    }

    /// Returns usage statistics.
    pub fn stats(&self) -> InventoryStats {
        self.stats.read().clone()
    }

    /// Resets statistics.
    pub fn reset_stats(&self) {
        *self.stats.write() = InventoryStats::default();
    }

    fn fetch_lock(&self, key: &InventoryKey) -> Arc<Mutex<()>> {
        let mut locks = self.fetch_locks.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    fn memo_get(&self, key: &InventoryKey) -> Option<Arc<HashSet<String>>> {
        let hit = self.memo.read().get(key).cloned();
        if hit.is_some() {
            self.stats.write().memo_hits += 1;
        }
        hit
    }

    fn load_durable(&self, key: &InventoryKey) -> Option<HashSet<String>> {
        let store = self.store.as_ref()?;
        match store.load(key) {
            Ok(Some(terms)) => {
                info!(path = %store.path_for(key).display(), "loaded cached census terms");
                self.stats.write().disk_hits += 1;
                Some(terms)
            }
            Ok(None) => None,
            Err(e) => {
                if e.is_corruption() {
                    self.stats.write().corrupt_files += 1;
                }
                warn!(
                    path = %store.path_for(key).display(),
                    error = %e,
                    "inventory cache file unusable, refetching"
                );
                None
            }
        }
    }

    fn fetch(&self, key: &InventoryKey) -> EnhancerResult<HashSet<String>> {
        info!(%key, "fetching census terms");
        self.stats.write().fetches += 1;

        let result = self.stream_terms(key);
        if let Err(e) = &result {
            self.stats.write().backend_failures += 1;
            warn!(%key, error = %e, "census read failed");
        }
        result
    }

    fn stream_terms(&self, key: &InventoryKey) -> EnhancerResult<HashSet<String>> {
        let mut terms = HashSet::new();
        let stream = self
            .backend
            .stream_distinct_values(&key.version, &key.organism, &key.column)?;

        for chunk in stream {
            terms.extend(
                chunk?
                    .into_iter()
                    .flatten()
                    .filter(|value| !SENTINEL_VALUES.contains(&value.as_str())),
            );
        }
        debug!(%key, count = terms.len(), "census terms streamed");
        Ok(terms)
    }

    fn persist(&self, key: &InventoryKey, terms: &HashSet<String>) {
        if let Some(store) = &self.store {
            match store.save(key, terms) {
                Ok(path) => info!(path = %path.display(), "saved census terms to cache"),
                Err(e) => warn!(%key, error = %e, "could not save census terms"),
            }
        }
    }
}

impl std::fmt::Debug for TermInventoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermInventoryCache")
            .field("memo_entries", &self.memo_len())
            .field("store", &self.store)
            .finish()
    }
}
