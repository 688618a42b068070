//! Unbounded in-memory keyed cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::trace;

/// Thread-safe map from item key to decoded value.
///
/// Only completed results are stored, so `lookup` never waits on a fetch.
/// The lock is held for the map operation alone; values are cloned out
/// (use `Arc` or `Bytes` for cheap clones). There is no eviction.
pub struct KeyedCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Inserts or overwrites the value for `key`.
    pub fn store(&self, key: K, value: V) {
        trace!(key = ?key, "Storing value in cache");
        self.entries.write().insert(key, value);
    }

    /// Returns the cached value, counting a hit or miss.
    pub fn lookup(&self, key: &K) -> Option<V> {
        let value = self.entries.read().get(key).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = ?key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = ?key, "Cache miss");
        }
        value
    }

    /// Returns the cached value without touching the statistics.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Removes and returns the value for `key`.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.entries.write().remove(key);
        if removed.is_some() {
            trace!(key = ?key, "Removed value from cache");
        }
        removed
    }

    /// Returns true if `key` has a value.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. Statistics are kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for KeyedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCache")
            .field("size", &self.entries.try_read().map(|e| e.len()))
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of lookups that found a value.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached entries.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} entries, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}
