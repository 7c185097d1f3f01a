//! ringcache: building blocks for a sharded, distributed cache layer.
//!
//! - [`ring`]: consistent hash ring deciding which node owns a key.
//! - [`policy`]: bounded LRU cache with an eviction hook for one node's data.
//! - [`coalesce`]: collapses concurrent identical fetches into one execution.
//!
//! A read path typically composes all three: coalesce the request, serve it
//! from the local cache, and on a miss route it to the owner picked by the
//! ring. Transport, remote fetch and the backing data source are left to the
//! caller.
//!
//! `HashRing` and `EvictionCache` are not internally synchronized. Enable
//! the `concurrency` feature for `RwLock`-wrapped handles, or lock them at
//! whatever granularity the service needs.

pub mod coalesce;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod ring;
