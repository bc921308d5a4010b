//! Read-through / write-through cache in front of a record store.
//!
//! The cache is never authoritative. Callers mutate the store first and only
//! then update the cache:
//!
//! - after a successful save, [`RecordCache::write_through`]
//! - after a successful delete, [`RecordCache::evict`]
//!
//! A failed store call leaves the cache untouched. There is no TTL and no
//! size bound. Concurrent misses on the same key may each reach the store;
//! whichever fetch completes last wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use orderlink_storage::{DynStore, Record, StorageError};
use serde::Serialize;

/// Hit/miss counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Cache of materialized records keyed by id.
pub struct RecordCache<R: Record> {
    entries: DashMap<R::Id, R>,
    store: DynStore<R>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: Record> RecordCache<R> {
    pub fn new(store: DynStore<R>) -> Self {
        Self {
            entries: DashMap::new(),
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn new_shared(store: DynStore<R>) -> Arc<Self> {
        Arc::new(Self::new(store))
    }

    /// The store this cache fronts.
    pub fn store(&self) -> &DynStore<R> {
        &self.store
    }

    /// Return the cached record, or fetch it from the store and cache it.
    ///
    /// Absent records are not cached. A store error is returned as-is and
    /// leaves the cache unchanged.
    pub async fn read_through(&self, id: &R::Id) -> Result<Option<R>, StorageError> {
        let cached = self.entries.get(id).map(|entry| entry.value().clone());
        if let Some(record) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(kind = R::KIND, id = %id, "Cache hit");
            return Ok(Some(record));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fetched = self.store.get_by_id(id).await?;
        if let Some(record) = &fetched {
            self.entries.insert(id.clone(), record.clone());
        }
        tracing::debug!(kind = R::KIND, id = %id, found = fetched.is_some(), "Cache miss");
        Ok(fetched)
    }

    /// Replace the entry for `record` after a successful store write.
    pub fn write_through(&self, record: &R) {
        self.entries.insert(record.id().clone(), record.clone());
        tracing::debug!(kind = R::KIND, id = %record.id(), "Cache write-through");
    }

    /// Drop the entry for `id` after a successful store delete.
    pub fn evict(&self, id: &R::Id) {
        if self.entries.remove(id).is_some() {
            tracing::debug!(kind = R::KIND, id = %id, "Cache evict");
        }
    }

    /// Cached value without touching the store or the counters.
    pub fn peek(&self, id: &R::Id) -> Option<R> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl<R: Record> std::fmt::Debug for RecordCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCache")
            .field("kind", &R::KIND)
            .field("stats", &self.stats())
            .finish()
    }
}
