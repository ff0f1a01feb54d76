//! Session-scoped caches for the CMIS client.
//!
//! A session keeps three independent stores: the object cache (object id →
//! domain object), the type-definition cache (type id → raw definition), and
//! the object-type cache (type id → converted domain type). All three are
//! instances of the same generic [`Cache`] trait so each can be swapped or
//! faked independently.
//!
//! # Design Rules
//!
//! 1. Populate on miss, invalidate explicitly. No implicit expiration.
//! 2. A write replaces the previous value for the key, never appends.
//! 3. Readers observe either the old or the new value, never a torn one.
//! 4. Staleness is tolerated by design; callers needing freshness bypass
//!    the cache or invalidate first.

pub mod memory;
pub mod traits;

pub use memory::InMemoryCache;
pub use traits::Cache;
