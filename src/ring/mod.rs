//! Consistent hashing: which node owns a cache key.
//!
//! See [`HashRing`] for the ring itself and [`hasher`] for the pluggable
//! position function.

pub mod hash_ring;
pub mod hasher;

#[cfg(feature = "concurrency")]
pub use hash_ring::ConcurrentHashRing;
pub use hash_ring::{DEFAULT_REPLICAS, HashRing};
pub use hasher::{Crc32Hasher, RingHasher};
