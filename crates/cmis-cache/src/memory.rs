use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use tracing::trace;

use crate::traits::Cache;

/// In-memory, HashMap-based cache.
///
/// The default store for all three session caches. Values are cloned on
/// read and write; the `RwLock` guarantees a reader sees either the old or
/// the new value for a key, never a half-written one.
pub struct InMemoryCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryCache<K, V>
where
    K: Eq + Hash,
{
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V> for InMemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        let map = self.entries.read().expect("lock poisoned");
        map.get(key).cloned()
    }

    fn put(&self, key: K, value: V) {
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(key, value);
    }

    fn remove(&self, key: &K) -> Option<V> {
        let mut map = self.entries.write().expect("lock poisoned");
        map.remove(key)
    }

    fn clear(&self) {
        let mut map = self.entries.write().expect("lock poisoned");
        trace!(dropped = map.len(), "cache cleared");
        map.clear();
    }

    fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }
}

impl<K, V> std::fmt::Debug for InMemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryCache")
            .field("entry_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> InMemoryCache<String, String> {
        InMemoryCache::new()
    }

    // -----------------------------------------------------------------------
    // Core contract
    // -----------------------------------------------------------------------

    #[test]
    fn get_on_empty_cache_is_miss() {
        let c = cache();
        assert_eq!(c.get(&"k".to_string()), None);
    }

    #[test]
    fn put_then_get() {
        let c = cache();
        c.put("k".into(), "v".into());
        assert_eq!(c.get(&"k".to_string()), Some("v".to_string()));
    }

    #[test]
    fn put_replaces_never_appends() {
        let c = cache();
        c.put("k".into(), "old".into());
        c.put("k".into(), "new".into());
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(&"k".to_string()), Some("new".to_string()));
    }

    #[test]
    fn remove_returns_previous_value() {
        let c = cache();
        c.put("k".into(), "v".into());
        assert_eq!(c.remove(&"k".to_string()), Some("v".to_string()));
        assert_eq!(c.remove(&"k".to_string()), None);
        assert_eq!(c.get(&"k".to_string()), None);
    }

    #[test]
    fn clear_removes_all() {
        let c = cache();
        c.put("a".into(), "1".into());
        c.put("b".into(), "2".into());
        assert_eq!(c.len(), 2);
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn remove_affects_future_lookups_only() {
        let c = cache();
        c.put("k".into(), "v".into());
        let held = c.get(&"k".to_string()).unwrap();
        c.remove(&"k".to_string());
        // The value handed out earlier stays valid.
        assert_eq!(held, "v");
        assert_eq!(c.get(&"k".to_string()), None);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn last_write_wins_under_contention() {
        use std::sync::Arc;
        use std::thread;

        let c: Arc<InMemoryCache<String, u32>> = Arc::new(InMemoryCache::new());
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    for _ in 0..100 {
                        c.put("shared".into(), i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        // Whichever write landed last, the value is one of the written ones,
        // whole and unmixed.
        let v = c.get(&"shared".to_string()).unwrap();
        assert!(v < 8);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let c: Arc<InMemoryCache<String, String>> = Arc::new(InMemoryCache::new());
        c.put("k".into(), "v".into());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    assert_eq!(c.get(&"k".to_string()), Some("v".to_string()));
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    // -----------------------------------------------------------------------
    // Debug
    // -----------------------------------------------------------------------

    #[test]
    fn debug_format() {
        let c = cache();
        c.put("k".into(), "v".into());
        let dbg = format!("{c:?}");
        assert!(dbg.contains("InMemoryCache"));
        assert!(dbg.contains("entry_count"));
    }
}
