use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// Capacity-bounded associative cache mapping keys to *optional* values:
/// `Some(v)` is a positive entry, `None` a remembered miss ("known
/// absent"), and an untracked key means nothing is known. Negative
/// entries let read-through callers skip repeated store lookups for keys
/// that were never written.
///
/// Eviction removes whatever entry the underlying map yields first, i.e.
/// an arbitrary one. Retention is NOT recency based and callers must not
/// rely on any particular entry surviving.
pub struct BoundedCache<K, V> {
    capacity: usize,
    map: RwLock<HashMap<K, Option<V>>>,
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        Self { capacity, map: RwLock::new(HashMap::with_capacity(capacity)) }
    }

    /// Outer `None` = key not tracked; `Some(None)` = tracked negative entry
    pub fn get(&self, key: &K) -> Option<Option<V>> {
        self.map.read().get(key).cloned()
    }

    pub fn has(&self, key: &K) -> bool {
        self.map.read().contains_key(key)
    }

    pub fn add(&self, key: K, value: Option<V>) {
        let mut map = self.map.write();
        if map.len() >= self.capacity && !map.contains_key(&key) {
            if let Some(evictee) = map.keys().next().cloned() {
                map.remove(&evictee);
            }
        }
        map.insert(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<Option<V>> {
        self.map.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn clear(&self) {
        self.map.write().clear();
    }
}
