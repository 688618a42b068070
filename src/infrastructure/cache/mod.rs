//! In-memory result caching.

pub mod keyed_cache;

pub use keyed_cache::{CacheStats, KeyedCache};
