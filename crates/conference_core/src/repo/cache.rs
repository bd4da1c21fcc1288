//! Second-level read cache keyed by entity id.
//!
//! # Invariants
//! - Holds at most `capacity` rows; the least recently used row goes first.
//! - Writers evict before touching the row and repopulate after commit, so a
//!   reader never sees an entry older than the last committed write.
//! - A poisoned lock is recovered, the map holds no cross-entry invariant.

use crate::model::entity::{EntityId, Stored};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Rows kept per entity type unless configured otherwise.
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Bounded read-through/write-through cache of persisted rows for one entity type.
#[derive(Debug)]
pub struct EntityCache<E> {
    entries: Mutex<LruCache<EntityId, Stored<E>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E> Default for EntityCache<E> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl<E> EntityCache<E> {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<EntityId, Stored<E>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Clone> EntityCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached row, recording a hit or miss.
    pub fn get(&self, id: EntityId) -> Option<Stored<E>> {
        let found = self.lock().get(&id).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores `entity` as the latest committed state of its row.
    pub fn put(&self, entity: &Stored<E>) {
        self.lock().put(entity.id, entity.clone());
    }

    pub fn evict(&self, id: EntityId) {
        self.lock().pop(&id);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Membership test that leaves recency untouched.
    pub fn contains(&self, id: EntityId) -> bool {
        self.lock().contains(&id)
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}
