//! # Bounded LRU Cache with Eviction Hook
//!
//! Keeps one node's in-memory footprint bounded: once more than `capacity`
//! entries are present the least recently used one is evicted and handed to
//! an optional callback.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                        EvictionCache<K, V>                           │
//!   │                                                                      │
//!   │   index: FxHashMap<K, SlotId>        order: IntrusiveList<Entry>     │
//!   │   ┌─────────┬────────┐                                               │
//!   │   │  "a"    │ id_3   │ ──────►  head (MRU)                           │
//!   │   │  "b"    │ id_1   │ ──┐        [id_3: a] ◄──► [id_2: c]           │
//!   │   │  "c"    │ id_2   │   └──────────────────────► [id_1: b]          │
//!   │   └─────────┴────────┘                           tail (LRU)          │
//!   │                                                                      │
//!   │   on_evicted: Option<Box<dyn FnMut(&K, &V) + Send + Sync>>           │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   put("d", v) with capacity 3:
//!     1. push "d" at head
//!     2. len 4 > 3  ──► pop tail "b", drop it from index
//!     3. on_evicted(&"b", &value_b)
//! ```
//!
//! ## Operations
//!
//! | Method           | Complexity | Refreshes | Calls `on_evicted` |
//! |------------------|------------|-----------|--------------------|
//! | `put(k, v)`      | O(1)       | yes       | on overflow        |
//! | `get(&k)`        | O(1)       | yes       | never              |
//! | `peek(&k)`       | O(1)       | no        | never              |
//! | `remove(&k)`     | O(1)       | -         | never              |
//! | `evict_oldest()` | O(1)       | -         | yes                |
//! | `clear()`        | O(n)       | -         | never              |
//!
//! ## Capacity
//!
//! `capacity == 0` turns automatic eviction off: the cache grows until the
//! caller removes entries with `remove` or `evict_oldest`.
//!
//! ## Thread Safety
//!
//! - `EvictionCache`: **NOT thread-safe**, every access takes `&mut self`
//!   or `&self`; wrap it in a lock per shard.
//! - `ConcurrentEvictionCache` (feature `concurrency`): `parking_lot::RwLock`
//!   wrapper. `get` still needs the write lock because it reorders.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use ringcache::policy::lru::EvictionCache;
//!
//! let evicted = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&evicted);
//!
//! let mut cache: EvictionCache<&str, u32> = EvictionCache::new(2).with_on_evicted(move |k, v| {
//!     sink.lock().unwrap().push((*k, *v));
//! });
//!
//! cache.put("a", 1);
//! cache.put("b", 2);
//! assert_eq!(cache.get(&"a"), Some(&1)); // "a" is now most recent
//! cache.put("c", 3);                      // evicts "b"
//!
//! assert_eq!(cache.get(&"b"), None);
//! assert_eq!(*evicted.lock().unwrap(), vec![("b", 2)]);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
#[cfg(feature = "concurrency")]
use std::sync::Arc;

#[cfg(feature = "concurrency")]
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ds::{IntrusiveList, SlotId};
use crate::error::InvariantError;

/// Callback invoked with each entry evicted for capacity.
pub type OnEvicted<K, V> = Box<dyn FnMut(&K, &V) + Send + Sync>;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Bounded key-value store with least-recently-used eviction.
pub struct EvictionCache<K, V> {
    index: FxHashMap<K, SlotId>,
    order: IntrusiveList<Entry<K, V>>,
    capacity: usize,
    on_evicted: Option<OnEvicted<K, V>>,
}

impl<K, V> EvictionCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` entries (`0` = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            order: IntrusiveList::with_capacity(capacity),
            capacity,
            on_evicted: None,
        }
    }

    /// Sets the eviction callback, builder style.
    pub fn with_on_evicted<F>(mut self, f: F) -> Self
    where
        F: FnMut(&K, &V) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Box::new(f));
        self
    }

    /// Replaces (or clears, with `None`) the eviction callback.
    pub fn set_on_evicted(&mut self, f: Option<OnEvicted<K, V>>) {
        self.on_evicted = f;
    }

    /// Inserts or overwrites `key`, marking it most recently used.
    ///
    /// Returns the previous value when `key` was already cached. A new entry
    /// that pushes the cache past its capacity evicts the least recently used
    /// entry before this returns.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&id) = self.index.get(&key) {
            self.order.move_to_front(id);
            let previous = self
                .order
                .get_mut(id)
                .map(|entry| std::mem::replace(&mut entry.value, value));

            #[cfg(debug_assertions)]
            self.validate_invariants();

            return previous;
        }

        let id = self.order.push_front(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);

        if self.capacity != 0 && self.order.len() > self.capacity {
            trace!(capacity = self.capacity, "capacity exceeded, evicting oldest");
            self.evict_oldest();
        }

        #[cfg(debug_assertions)]
        self.validate_invariants();

        None
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let id = *self.index.get(key)?;
        self.order.move_to_front(id);
        self.order.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without touching recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let id = *self.index.get(key)?;
        self.order.get(id).map(|entry| &entry.value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Removes `key` and returns its value. Does not call `on_evicted`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let id = self.index.remove(key)?;
        let entry = self.order.remove(id)?;

        #[cfg(debug_assertions)]
        self.validate_invariants();

        Some(entry.value)
    }

    /// Evicts the least recently used entry, calling `on_evicted` first.
    ///
    /// Returns the evicted pair, or `None` on an empty cache.
    pub fn evict_oldest(&mut self) -> Option<(K, V)> {
        let Entry { key, value } = self.order.pop_back()?;
        self.index.remove(&key);

        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(&key, &value);
        }
        Some((key, value))
    }

    /// Returns the entry that would be evicted next.
    pub fn peek_oldest(&self) -> Option<(&K, &V)> {
        self.order.back().map(|entry| (&entry.key, &entry.value))
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter().map(|entry| &entry.key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry. Does not call `on_evicted`.
    pub fn clear(&mut self) {
        self.index.clear();
        self.order.clear();
    }

    /// Verifies that the index and recency list agree and the bound holds.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.order.len() {
            return Err(InvariantError::LengthMismatch {
                indexed: self.index.len(),
                linked: self.order.len(),
            });
        }
        if self.capacity != 0 && self.index.len() > self.capacity {
            return Err(InvariantError::OverCapacity {
                len: self.index.len(),
                capacity: self.capacity,
            });
        }
        for (key, &id) in &self.index {
            match self.order.get(id) {
                Some(entry) if entry.key == *key => {},
                Some(_) => return Err(InvariantError::KeyMismatch { slot: id.index() }),
                None => return Err(InvariantError::EmptySlot { slot: id.index() }),
            }
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn validate_invariants(&self) {
        debug_assert_eq!(self.index.len(), self.order.len());
        if self.capacity != 0 {
            debug_assert!(self.index.len() <= self.capacity);
        }
    }
}

impl<K, V> Default for EvictionCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// An unbounded cache with no eviction callback.
    fn default() -> Self {
        Self::new(0)
    }
}

impl<K, V> Extend<(K, V)> for EvictionCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K, V> fmt::Debug for EvictionCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictionCache")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .field("on_evicted", &self.on_evicted.is_some())
            .finish()
    }
}

/// Thread-safe eviction cache handle using `parking_lot::RwLock`.
///
/// Values are cloned out of the lock. Clones of the handle share one cache.
#[cfg(feature = "concurrency")]
pub struct ConcurrentEvictionCache<K, V> {
    inner: Arc<RwLock<EvictionCache<K, V>>>,
}

#[cfg(feature = "concurrency")]
impl<K, V> ConcurrentEvictionCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self::from_cache(EvictionCache::new(capacity))
    }

    /// Wraps an already configured cache (e.g. one with `on_evicted` set).
    pub fn from_cache(cache: EvictionCache<K, V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.inner.write().put(key, value)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.write().get(key).cloned()
    }

    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.read().peek(key).cloned()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.read().contains(key)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.write().remove(key)
    }

    pub fn evict_oldest(&self) -> Option<(K, V)> {
        self.inner.write().evict_oldest()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

#[cfg(feature = "concurrency")]
impl<K, V> Clone for ConcurrentEvictionCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<K, V> fmt::Debug for ConcurrentEvictionCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.read();
        f.debug_struct("ConcurrentEvictionCache")
            .field("len", &cache.index.len())
            .field("capacity", &cache.capacity)
            .finish()
    }
}
