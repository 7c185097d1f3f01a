//! Error types for the ringcache library.
//!
//! Lookups never fail: absence is reported with `Option`, and the call
//! coalescer hands back the caller's own error type untouched. What remains
//! is rejecting a bad ring configuration up front, and reporting a cache
//! whose index and recency list have drifted apart.
//!
//! ```
//! use ringcache::error::ConfigError;
//! use ringcache::ring::HashRing;
//!
//! assert!(HashRing::try_new(3).is_ok());
//! assert_eq!(HashRing::try_new(0).unwrap_err(), ConfigError::ZeroReplicas);
//! ```

use std::fmt;

/// Rejected construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A hash ring was asked for zero virtual positions per node, so no key
    /// could ever be placed.
    ZeroReplicas,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroReplicas => {
                f.write_str("replicas must be > 0, a ring without virtual nodes selects nothing")
            },
        }
    }
}

impl std::error::Error for ConfigError {}

/// Disagreement between an [`EvictionCache`]'s key index and its recency
/// list, reported by
/// [`check_invariants`](crate::policy::lru::EvictionCache::check_invariants).
///
/// [`EvictionCache`]: crate::policy::lru::EvictionCache
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvariantError {
    /// The index and the recency list hold a different number of entries.
    LengthMismatch { indexed: usize, linked: usize },
    /// A bounded cache holds more entries than its capacity.
    OverCapacity { len: usize, capacity: usize },
    /// The index points at a slot with no entry in it.
    EmptySlot { slot: usize },
    /// The index points at a slot holding some other key.
    KeyMismatch { slot: usize },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { indexed, linked } => {
                write!(f, "index has {indexed} keys, order has {linked} nodes")
            },
            Self::OverCapacity { len, capacity } => {
                write!(f, "len {len} exceeds capacity {capacity}")
            },
            Self::EmptySlot { slot } => write!(f, "index points at empty slot {slot}"),
            Self::KeyMismatch { slot } => {
                write!(f, "slot {slot} holds a different key than the index")
            },
        }
    }
}

impl std::error::Error for InvariantError {}
