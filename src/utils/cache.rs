//! Caching helpers built on moka

use moka::sync::Cache;
use std::time::Duration;

/// Create a synchronous cache with a time-to-live
pub fn new_sync_cache<K, V>(ttl: Duration) -> Cache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder().time_to_live(ttl).build()
}

/// Create a synchronous cache with a time-to-live and a capacity bound
pub fn new_sync_cache_with_capacity<K, V>(ttl: Duration, max_capacity: u64) -> Cache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .time_to_live(ttl)
        .max_capacity(max_capacity)
        .build()
}
