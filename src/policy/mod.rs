//! Eviction policies bounding a node's local cache.

pub mod lru;

#[cfg(feature = "concurrency")]
pub use lru::ConcurrentEvictionCache;
pub use lru::{EvictionCache, OnEvicted};
