pub use crate::coalesce::CallCoalescer;
pub use crate::ds::{IntrusiveList, SlotArena, SlotId};
pub use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "concurrency")]
pub use crate::policy::ConcurrentEvictionCache;
pub use crate::policy::{EvictionCache, OnEvicted};
#[cfg(feature = "concurrency")]
pub use crate::ring::ConcurrentHashRing;
pub use crate::ring::{Crc32Hasher, DEFAULT_REPLICAS, HashRing, RingHasher};
