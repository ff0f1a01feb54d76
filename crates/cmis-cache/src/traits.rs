use std::hash::Hash;

/// A keyed store with at most one authoritative value per key.
///
/// All implementations must satisfy these invariants:
/// - `put` replaces any existing value for the key (last write wins).
/// - `get` returns a snapshot of the value at some point in time; it never
///   observes a partially written value.
/// - `remove` and `clear` affect future lookups only; values already handed
///   out stay valid.
/// - Operations never fail: a cache that cannot hold a value simply behaves
///   as if the entry were evicted.
pub trait Cache<K, V>: Send + Sync
where
    K: Eq + Hash,
{
    /// Look up a value. `None` is a miss.
    fn get(&self, key: &K) -> Option<V>;

    /// Store a value, replacing any previous value for the key.
    fn put(&self, key: K, value: V);

    /// Drop an entry. Returns the removed value if one was present.
    fn remove(&self, key: &K) -> Option<V>;

    /// Drop all entries.
    fn clear(&self);

    /// Number of entries currently held.
    fn len(&self) -> usize;

    /// `true` if the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
