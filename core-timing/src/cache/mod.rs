//! Bounded in-memory caching shared by the timing providers.

mod lru_cache;
mod stats;

pub use lru_cache::LruCache;
pub use stats::CacheStatistics;
