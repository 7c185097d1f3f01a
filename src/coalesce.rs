//! Call coalescing: one execution per key for concurrent duplicate requests.
//!
//! When many callers miss the local cache for the same key at once, only the
//! first one (the *leader*) should hit the backend. Everyone else arriving
//! while that call is in flight waits for it and receives a clone of the same
//! result.
//!
//! ## Architecture
//!
//! ```text
//!   caller A ──┐
//!   caller B ──┼──► registry: Mutex<FxHashMap<K, Arc<Call>>>
//!   caller C ──┘         │
//!                        │  A finds no record ──► inserts one, runs f()
//!                        │  B, C find A's record ──► wait on its Condvar
//!                        ▼
//!               Call { state: Mutex<Outcome>, done: Condvar }
//!                        │
//!                        │  A removes the record, then stores
//!                        │  Ready(result) and notifies all
//!                        ▼
//!               A, B, C all return the same Result<V, E>
//! ```
//!
//! ## Per-key state machine
//!
//! `Idle ──call──► Running ──f returns──► Completed (broadcast) ──► Idle`
//!
//! Errors are ordinary results: they are broadcast exactly like successes.
//! Nothing is cached once the record is gone, so the next call for the key
//! runs `f` again.
//!
//! ## Locking
//!
//! The registry lock is held only to look up, insert or remove a record,
//! never while `f` runs, so unrelated keys do not block each other. Waiters
//! block without a timeout; wrap `f` if a deadline is needed.
//!
//! If the leader's `f` panics, the record is marked abandoned and removed.
//! Waiters wake up and retry with their own closure, so one of them becomes
//! the new leader. The panic keeps unwinding in the original caller.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::thread;
//! use ringcache::coalesce::CallCoalescer;
//!
//! let coalescer: Arc<CallCoalescer<String, u64, String>> = Arc::new(CallCoalescer::new());
//! let backend_hits = Arc::new(AtomicUsize::new(0));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let coalescer = Arc::clone(&coalescer);
//!         let backend_hits = Arc::clone(&backend_hits);
//!         thread::spawn(move || {
//!             coalescer.call("user:7".to_string(), || {
//!                 backend_hits.fetch_add(1, Ordering::SeqCst);
//!                 Ok(42)
//!             })
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     assert_eq!(h.join().unwrap(), Ok(42));
//! }
//! // Between 1 and 4 backend hits depending on how the calls overlapped.
//! assert!(backend_hits.load(Ordering::SeqCst) >= 1);
//! assert_eq!(coalescer.in_flight(), 0);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

enum Outcome<V, E> {
    Pending,
    Ready(Result<V, E>),
    Abandoned,
}

/// One in-flight execution and its single-use completion signal.
struct Call<V, E> {
    state: Mutex<Outcome<V, E>>,
    done: Condvar,
    // Only ever incremented. Callers join a record through the registry, and
    // the record leaves the registry before `complete`, so nobody joins a
    // finished call and the count is final by the time `finish` reads it.
    waiters: AtomicUsize,
}

impl<V, E> Call<V, E>
where
    V: Clone,
    E: Clone,
{
    fn new() -> Self {
        Self {
            state: Mutex::new(Outcome::Pending),
            done: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    fn complete(&self, outcome: Outcome<V, E>) {
        *self.state.lock() = outcome;
        self.done.notify_all();
    }

    /// Blocks until the leader finishes. `None` means it was abandoned.
    fn wait(&self) -> Option<Result<V, E>> {
        let mut state = self.state.lock();
        while matches!(*state, Outcome::Pending) {
            self.done.wait(&mut state);
        }
        match &*state {
            Outcome::Ready(result) => Some(result.clone()),
            Outcome::Pending | Outcome::Abandoned => None,
        }
    }
}

type Registry<K, V, E> = Mutex<FxHashMap<K, Arc<Call<V, E>>>>;

/// Deregisters the leader's record on completion, or on unwind.
struct Leader<'a, K, V, E>
where
    K: Eq + Hash,
    V: Clone,
    E: Clone,
{
    registry: &'a Registry<K, V, E>,
    key: Option<K>,
    call: Arc<Call<V, E>>,
}

impl<K, V, E> Leader<'_, K, V, E>
where
    K: Eq + Hash,
    V: Clone,
    E: Clone,
{
    /// Broadcasts `result` and returns whether any waiter shared it.
    fn finish(mut self, result: &Result<V, E>) -> bool {
        self.deregister();
        self.call.complete(Outcome::Ready(result.clone()));
        self.call.waiters.load(Ordering::Acquire) > 0
    }

    fn deregister(&mut self) {
        if let Some(key) = self.key.take() {
            let mut calls = self.registry.lock();
            if calls
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.call))
            {
                calls.remove(&key);
            }
        }
    }
}

impl<K, V, E> Drop for Leader<'_, K, V, E>
where
    K: Eq + Hash,
    V: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        if self.key.is_some() {
            warn!("in-flight call abandoned by a panicking leader, waiters will retry");
            self.deregister();
            self.call.complete(Outcome::Abandoned);
        }
    }
}

/// Collapses concurrent calls for the same key into one execution.
///
/// `V` and `E` are cloned once per waiter; wrap large payloads in `Arc`.
pub struct CallCoalescer<K, V, E> {
    calls: Registry<K, V, E>,
}

impl<K, V, E> CallCoalescer<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(FxHashMap::default()),
        }
    }

    /// Runs `f` for `key`, unless a call for `key` is already in flight, in
    /// which case this blocks and returns that call's result instead.
    ///
    /// # Example
    ///
    /// ```
    /// use ringcache::coalesce::CallCoalescer;
    ///
    /// let coalescer = CallCoalescer::<&str, String, String>::new();
    /// let err = coalescer.call("k", || Err("backend down".to_string()));
    /// assert_eq!(err, Err("backend down".to_string()));
    ///
    /// // Nothing is remembered once the call completes.
    /// let ok = coalescer.call("k", || Ok("fresh".to_string()));
    /// assert_eq!(ok.as_deref(), Ok("fresh"));
    /// ```
    pub fn call<F>(&self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.call_shared(key, f).0
    }

    /// Like [`call`](Self::call), also reporting whether the result was
    /// shared between more than one caller.
    pub fn call_shared<F>(&self, key: K, f: F) -> (Result<V, E>, bool)
    where
        F: FnOnce() -> Result<V, E>,
    {
        loop {
            let call = {
                let mut calls = self.calls.lock();
                match calls.get(&key).map(Arc::clone) {
                    Some(call) => {
                        call.waiters.fetch_add(1, Ordering::AcqRel);
                        call
                    },
                    None => {
                        let call = Arc::new(Call::new());
                        calls.insert(key.clone(), Arc::clone(&call));
                        drop(calls);
                        return self.lead(key, call, f);
                    },
                }
            };

            trace!("joined in-flight call");
            if let Some(result) = call.wait() {
                return (result, true);
            }
        }
    }

    fn lead<F>(&self, key: K, call: Arc<Call<V, E>>, f: F) -> (Result<V, E>, bool)
    where
        F: FnOnce() -> Result<V, E>,
    {
        let leader = Leader {
            registry: &self.calls,
            key: Some(key),
            call,
        };
        let result = f();
        let shared = leader.finish(&result);
        (result, shared)
    }

    /// Number of keys with a call currently executing.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of callers currently waiting on `key`'s in-flight call.
    pub fn waiters<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.calls
            .lock()
            .get(key)
            .map_or(0, |call| call.waiters.load(Ordering::Acquire))
    }
}

impl<K, V, E> Default for CallCoalescer<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> fmt::Debug for CallCoalescer<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallCoalescer")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}
