//! Consistent hash ring for key-to-node placement.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      HashRing { replicas: 3 }                           │
//! │                                                                         │
//! │   add_nodes(["2", "4", "6"])                                            │
//! │       │                                                                 │
//! │       │  for i in 0..replicas: position = hash(i ++ node_id)            │
//! │       ▼                                                                 │
//! │   positions (sorted)   [ 2,  4,  6, 12, 14, 16, 22, 24, 26 ]            │
//! │   owners               { 2→"2", 4→"4", 6→"6", 12→"2", ... }             │
//! │                                                                         │
//! │   lookup("11"):  hash = 11 ──► first position ≥ 11 is 12 ──► "2"        │
//! │   lookup("27"):  hash = 27 ──► past the last position, wrap to 2 ──► "2"│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! (Positions shown with a decimal-parsing hasher; the default is CRC-32.)
//!
//! ## Key Concepts
//!
//! - **Virtual nodes**: every node contributes `replicas` positions, spreading
//!   its share of the key space across the ring.
//! - **Wraparound**: a key hashing past the largest position belongs to the
//!   smallest one, which is what makes the sorted sequence a ring.
//! - **Order independence**: the same node set added in any order yields the
//!   same ring, as long as no two positions collide.
//!
//! ## Known Limitations
//!
//! - Nodes cannot be removed. When the topology shrinks, build a new ring from
//!   the surviving node set (see [`HashRing::nodes`]).
//! - When two virtual positions collide, the node added later owns that
//!   position. Rings built by different sequences of `add_nodes` calls may
//!   therefore disagree on the colliding positions.
//! - A ring with `replicas == 0` accepts nodes but never selects any of them.
//!   Use [`HashRing::try_new`] to reject that configuration up front.
//!
//! ## Thread Safety
//!
//! `HashRing` is a plain structure: `add_nodes` takes `&mut self`. Share it
//! behind a reader/writer lock, or use `ConcurrentHashRing` with the
//! `concurrency` feature.
//!
//! ## Performance
//!
//! - `lookup`: O(log V) binary search over V virtual positions
//! - `add_nodes`: O(k·replicas + V log V), the ring is re-sorted after each call

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::sync::Arc;

#[cfg(feature = "concurrency")]
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::ConfigError;
use crate::ring::hasher::{Crc32Hasher, RingHasher};

/// Virtual positions per node used by [`HashRing::default`].
pub const DEFAULT_REPLICAS: usize = 50;

/// Consistent hash ring mapping keys to node ids.
///
/// # Example
///
/// ```
/// use ringcache::ring::HashRing;
///
/// let mut ring = HashRing::new(50);
/// assert!(ring.is_empty());
/// assert_eq!(ring.lookup("user:42"), None);
///
/// ring.add_nodes(["cache-a", "cache-b", "cache-c"]);
/// let owner = ring.lookup("user:42").unwrap();
/// assert!(["cache-a", "cache-b", "cache-c"].contains(&owner));
///
/// // Deterministic until the topology changes
/// assert_eq!(ring.lookup("user:42"), Some(owner));
/// ```
pub struct HashRing<H = Crc32Hasher> {
    hasher: H,
    replicas: usize,
    positions: Vec<u32>,
    owners: FxHashMap<u32, Arc<str>>,
}

impl HashRing<Crc32Hasher> {
    /// Creates an empty ring using the CRC-32 hasher.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, Crc32Hasher)
    }

    /// Like [`new`](Self::new) but rejects `replicas == 0`.
    pub fn try_new(replicas: usize) -> Result<Self, ConfigError> {
        Self::try_with_hasher(replicas, Crc32Hasher)
    }
}

impl<H: RingHasher> HashRing<H> {
    /// Creates an empty ring with a custom hasher.
    pub fn with_hasher(replicas: usize, hasher: H) -> Self {
        Self {
            hasher,
            replicas,
            positions: Vec::new(),
            owners: FxHashMap::default(),
        }
    }

    /// Like [`with_hasher`](Self::with_hasher) but rejects `replicas == 0`.
    ///
    /// # Example
    ///
    /// ```
    /// use ringcache::ring::HashRing;
    ///
    /// let hasher = |data: &[u8]| data.len() as u32;
    /// assert!(HashRing::try_with_hasher(0, hasher).is_err());
    /// assert!(HashRing::try_with_hasher(4, hasher).is_ok());
    /// ```
    pub fn try_with_hasher(replicas: usize, hasher: H) -> Result<Self, ConfigError> {
        if replicas == 0 {
            return Err(ConfigError::ZeroReplicas);
        }
        Ok(Self::with_hasher(replicas, hasher))
    }

    /// Returns `true` if the ring has no virtual positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of virtual positions on the ring, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// The sorted ring positions.
    #[inline]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Adds nodes to the ring.
    ///
    /// Each node gets `replicas` positions computed as
    /// `hash(decimal(i) ++ node_id)`. Adding an id that is already present
    /// duplicates its positions; callers are expected to dedupe.
    ///
    /// # Example
    ///
    /// ```
    /// use ringcache::ring::HashRing;
    ///
    /// let mut ring = HashRing::new(8);
    /// ring.add_nodes(["a", "b"]);
    /// ring.add_nodes(vec![String::from("c")]);
    /// assert_eq!(ring.len(), 24);
    /// assert_eq!(ring.node_count(), 3);
    /// ```
    pub fn add_nodes<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0usize;
        let mut input = String::new();

        for id in ids {
            let id = id.as_ref();
            let owner: Arc<str> = Arc::from(id);
            self.positions.reserve(self.replicas);

            for i in 0..self.replicas {
                input.clear();
                // Writing into a String cannot fail.
                let _ = write!(input, "{i}{id}");

                let position = self.hasher.hash(input.as_bytes());
                self.positions.push(position);
                self.owners.insert(position, Arc::clone(&owner));
            }
            added += 1;
        }

        self.positions.sort_unstable();
        debug!(
            added,
            replicas = self.replicas,
            positions = self.positions.len(),
            "extended hash ring"
        );
    }

    /// Returns the node that owns `key`, or `None` on an empty ring.
    ///
    /// The owner is the node at the first position `>= hash(key)`, wrapping
    /// to the smallest position when the hash is past the end.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Option<&str> {
        if self.is_empty() {
            return None;
        }

        let hash = self.hasher.hash(key.as_ref());
        let mut idx = self.positions.partition_point(|&pos| pos < hash);
        if idx == self.positions.len() {
            idx = 0;
        }

        self.owners.get(&self.positions[idx]).map(|owner| &**owner)
    }

    /// Distinct node ids that own at least one position, sorted.
    ///
    /// A node whose every position was overwritten by a collision is not
    /// reported.
    pub fn nodes(&self) -> Vec<&str> {
        self.owners
            .values()
            .map(|owner| &**owner)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }
}

impl Default for HashRing<Crc32Hasher> {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS)
    }
}

impl<H: RingHasher, S: AsRef<str>> Extend<S> for HashRing<H> {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.add_nodes(iter);
    }
}

impl<H: Clone> Clone for HashRing<H> {
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            replicas: self.replicas,
            positions: self.positions.clone(),
            owners: self.owners.clone(),
        }
    }
}

impl<H> fmt::Debug for HashRing<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("positions", &self.positions.len())
            .finish_non_exhaustive()
    }
}

/// Thread-safe hash ring handle using `parking_lot::RwLock`.
///
/// Lookups share a read lock; `add_nodes` and `replace` take the write lock.
/// Clones share the same ring.
///
/// # Example
///
/// ```
/// # #[cfg(feature = "concurrency")]
/// # {
/// use ringcache::ring::{ConcurrentHashRing, HashRing};
///
/// let ring = ConcurrentHashRing::new(HashRing::new(16));
/// ring.add_nodes(["a", "b"]);
///
/// // Topology shrank: rebuild without "b" and swap it in.
/// let mut rebuilt = HashRing::new(16);
/// rebuilt.add_nodes(["a"]);
/// ring.replace(rebuilt);
/// assert_eq!(ring.lookup("k").as_deref(), Some("a"));
/// # }
/// ```
#[cfg(feature = "concurrency")]
pub struct ConcurrentHashRing<H = Crc32Hasher> {
    inner: Arc<RwLock<HashRing<H>>>,
}

#[cfg(feature = "concurrency")]
impl<H: RingHasher> ConcurrentHashRing<H> {
    pub fn new(ring: HashRing<H>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ring)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn add_nodes<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.write().add_nodes(ids);
    }

    /// Returns an owned copy of the owning node id.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Option<String> {
        self.inner.read().lookup(key).map(str::to_owned)
    }

    /// Swaps in a rebuilt ring and returns the previous one.
    pub fn replace(&self, ring: HashRing<H>) -> HashRing<H> {
        std::mem::replace(&mut *self.inner.write(), ring)
    }

    /// Runs `f` against the ring under a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&HashRing<H>) -> R) -> R {
        f(&*self.inner.read())
    }
}

#[cfg(feature = "concurrency")]
impl<H> Clone for ConcurrentHashRing<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<H> fmt::Debug for ConcurrentHashRing<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentHashRing")
            .field("positions", &self.inner.read().positions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parses the input as a decimal number so positions are readable.
    fn decimal(data: &[u8]) -> u32 {
        std::str::from_utf8(data)
            .ok()
            .and_then(|s| s.parse().ok())
            .expect("test keys must be decimal")
    }

    fn decimal_ring() -> HashRing<fn(&[u8]) -> u32> {
        let mut ring = HashRing::with_hasher(3, decimal as fn(&[u8]) -> u32);
        ring.add_nodes(["6", "4", "2"]);
        ring
    }

    // ==============================================
    // Placement
    // ==============================================

    #[test]
    fn virtual_positions_are_sorted() {
        let ring = decimal_ring();
        assert_eq!(ring.positions(), &[2, 4, 6, 12, 14, 16, 22, 24, 26]);
        assert_eq!(ring.len(), 9);
        assert_eq!(ring.replicas(), 3);
    }

    #[test]
    fn lookup_picks_next_position_clockwise() {
        let ring = decimal_ring();
        assert_eq!(ring.lookup("2"), Some("2"));
        assert_eq!(ring.lookup("11"), Some("2"));
        assert_eq!(ring.lookup("23"), Some("4"));
        assert_eq!(ring.lookup("26"), Some("6"));
    }

    #[test]
    fn lookup_wraps_past_the_largest_position() {
        let ring = decimal_ring();
        assert_eq!(ring.lookup("27"), Some("2"));
        assert_eq!(ring.lookup("4000000000"), Some("2"));
    }

    #[test]
    fn adding_a_node_only_moves_keys_it_takes_over() {
        let mut ring = decimal_ring();
        ring.add_nodes(["8"]);

        assert_eq!(
            ring.positions(),
            &[2, 4, 6, 8, 12, 14, 16, 18, 22, 24, 26, 28]
        );
        assert_eq!(ring.lookup("27"), Some("8"));
        assert_eq!(ring.lookup("11"), Some("2"));
        assert_eq!(ring.lookup("23"), Some("4"));
        assert_eq!(ring.lookup("2"), Some("2"));
    }

    #[test]
    fn colliding_position_is_owned_by_later_node() {
        // "1" at replica 1 hashes to 11, as does "11" at replica 0 ("0"+"11").
        let mut ring = HashRing::with_hasher(2, decimal);
        ring.add_nodes(["1"]);
        ring.add_nodes(["11"]);

        assert_eq!(ring.positions(), &[1, 11, 11, 111]);
        assert_eq!(ring.lookup("5"), Some("11"));
        assert_eq!(ring.lookup("1"), Some("1"));
    }

    #[test]
    fn duplicate_add_duplicates_positions() {
        let mut ring = HashRing::new(4);
        ring.add_nodes(["a"]);
        ring.add_nodes(["a"]);
        assert_eq!(ring.len(), 8);
        assert_eq!(ring.nodes(), vec!["a"]);
    }

    // ==============================================
    // Empty and degenerate rings
    // ==============================================

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = HashRing::new(3);
        assert!(ring.is_empty());
        assert_eq!(ring.lookup("anything"), None);
        assert!(ring.nodes().is_empty());
    }

    #[test]
    fn zero_replicas_accepts_nodes_but_selects_none() {
        let mut ring = HashRing::new(0);
        ring.add_nodes(["a", "b"]);
        assert!(ring.is_empty());
        assert_eq!(ring.lookup("k"), None);
    }

    #[test]
    fn try_new_rejects_zero_replicas() {
        let err = HashRing::try_new(0).unwrap_err();
        assert_eq!(err, ConfigError::ZeroReplicas);
        assert!(err.to_string().contains("replicas"));
        assert_eq!(HashRing::try_new(5).unwrap().replicas(), 5);
    }

    #[test]
    fn default_uses_default_replicas() {
        let mut ring = HashRing::default();
        ring.extend(["x"]);
        assert_eq!(ring.replicas(), DEFAULT_REPLICAS);
        assert_eq!(ring.len(), DEFAULT_REPLICAS);
    }

    // ==============================================
    // Determinism
    // ==============================================

    #[test]
    fn same_nodes_in_different_order_agree() {
        let mut a = HashRing::new(1);
        let mut b = HashRing::new(1);
        a.add_nodes(["Bill", "Bob", "Bonny"]);
        b.add_nodes(["Bob", "Bonny", "Bill"]);

        assert_eq!(a.positions(), b.positions());
        for key in ["Ben", "Bob", "Bonny", "Bill", "Becky", "x", ""] {
            assert_eq!(a.lookup(key), b.lookup(key), "key {key:?}");
        }
    }

    #[test]
    fn lookup_is_stable_across_calls() {
        let mut ring = HashRing::new(50);
        ring.add_nodes((0..8).map(|i| format!("shard-{i}")));
        for i in 0..1000 {
            let key = format!("key-{i}");
            let first = ring.lookup(&key);
            assert!(first.is_some());
            assert_eq!(ring.lookup(&key), first);
        }
    }

    #[test]
    fn keys_spread_over_all_nodes() {
        let mut ring = HashRing::new(50);
        ring.add_nodes(["a", "b", "c", "d"]);

        let mut counts = FxHashMap::<&str, usize>::default();
        for i in 0..4000 {
            let owner = ring.lookup(format!("key-{i}")).unwrap();
            *counts.entry(owner).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        for (node, count) in counts {
            assert!(count > 100, "node {node} owns only {count} of 4000 keys");
        }
    }

    #[test]
    fn clone_is_independent() {
        let mut ring = HashRing::new(2);
        ring.add_nodes(["a"]);
        let snapshot = ring.clone();
        ring.add_nodes(["b"]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn debug_hides_hasher() {
        let ring = decimal_ring();
        let dbg = format!("{ring:?}");
        assert!(dbg.contains("replicas: 3"));
        assert!(dbg.contains("positions: 9"));
    }

    #[cfg(feature = "concurrency")]
    mod concurrent {
        use super::*;

        #[test]
        fn shared_handle_sees_topology_changes() {
            let ring = ConcurrentHashRing::new(HashRing::new(8));
            let other = ring.clone();
            assert!(other.is_empty());

            ring.add_nodes(["a"]);
            assert_eq!(other.lookup("k").as_deref(), Some("a"));
            assert_eq!(other.len(), 8);
        }

        #[test]
        fn replace_swaps_whole_ring() {
            let ring = ConcurrentHashRing::new(HashRing::new(8));
            ring.add_nodes(["a", "b"]);

            let mut rebuilt = HashRing::new(8);
            rebuilt.add_nodes(["b"]);
            let old = ring.replace(rebuilt);

            assert_eq!(old.node_count(), 2);
            assert_eq!(ring.read(|r| r.nodes().len()), 1);
            assert_eq!(ring.lookup("anything").as_deref(), Some("b"));
        }

        #[test]
        fn concurrent_lookups_during_add() {
            use std::thread;

            let ring = ConcurrentHashRing::new(HashRing::new(16));
            ring.add_nodes(["seed"]);

            let readers: Vec<_> = (0..4)
                .map(|t| {
                    let ring = ring.clone();
                    thread::spawn(move || {
                        for i in 0..500 {
                            assert!(ring.lookup(format!("{t}-{i}")).is_some());
                        }
                    })
                })
                .collect();

            for i in 0..20 {
                ring.add_nodes([format!("node-{i}")]);
            }
            for r in readers {
                r.join().unwrap();
            }
            assert_eq!(ring.len(), 21 * 16);
        }

        #[test]
        fn debug_reports_position_count_with_custom_hasher() {
            let ring = ConcurrentHashRing::new(HashRing::with_hasher(3, decimal));
            ring.add_nodes(["2", "4"]);
            let dbg = format!("{ring:?}");
            assert!(dbg.starts_with("ConcurrentHashRing"));
            assert!(dbg.contains("positions: 6"));
        }
    }
}
