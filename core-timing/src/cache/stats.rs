//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};

/// Counters reported by [`LruCache::statistics`](super::LruCache::statistics).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to make room for new ones
    pub evictions: u64,
    /// `hits + misses`
    pub total_requests: u64,
    pub current_size: usize,
    pub capacity: usize,
    /// `hits / total_requests`, 0.0 before the first request
    pub hit_rate: f64,
}

impl CacheStatistics {
    pub(crate) fn new(
        hits: u64,
        misses: u64,
        evictions: u64,
        current_size: usize,
        capacity: usize,
    ) -> Self {
        let total_requests = hits + misses;
        let hit_rate = if total_requests == 0 {
            0.0
        } else {
            hits as f64 / total_requests as f64
        };

        Self {
            hits,
            misses,
            evictions,
            total_requests,
            current_size,
            capacity,
            hit_rate,
        }
    }

    /// Returns true if every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.current_size >= self.capacity
    }

    /// Hit rate as a percentage.
    pub fn hit_rate_percentage(&self) -> f64 {
        self.hit_rate * 100.0
    }
}
