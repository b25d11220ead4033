//! Thread-safe LRU cache with hit/miss/eviction accounting.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::CacheStatistics;

struct Inner<K: Hash + Eq, V> {
    entries: lru::LruCache<K, V>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Fixed-capacity key/value store evicting the least recently used entry.
///
/// Every operation takes the internal lock for its whole duration, so a
/// single instance can be shared behind an `Arc` without any outer lock.
/// The lock is never held across an `.await`.
pub struct LruCache<K: Hash + Eq, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: NonZeroUsize,
}

impl<K: Hash + Eq, V: Clone> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: lru::LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the lru list half-updated
    // from our side, so a poisoned lock is still safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a clone of the value and marks the entry most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        match inner.entries.get(key).cloned() {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Inserts or updates an entry and marks it most recently used.
    ///
    /// Inserting a new key into a full cache evicts exactly one entry.
    pub fn set(&self, key: K, value: V) {
        let mut inner = self.lock();
        if inner.entries.contains(&key) {
            inner.entries.put(key, value);
        } else if inner.entries.push(key, value).is_some() {
            inner.evictions += 1;
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().entries.pop(key)
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Membership test that neither promotes the entry nor counts as a request.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn statistics(&self) -> CacheStatistics {
        let inner = self.lock();
        CacheStatistics::new(
            inner.hits,
            inner.misses,
            inner.evictions,
            inner.entries.len(),
            self.capacity.get(),
        )
    }
}
