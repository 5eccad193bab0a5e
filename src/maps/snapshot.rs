// ============================================================================
// ripple-store - Snapshot Map
// Copy-in/copy-out associative container with lazy cloning iterators
// ============================================================================

use std::collections::HashMap;
use std::collections::hash_map;
use std::hash::Hash;

/// A `HashMap` wrapper that never leaks references to its stored values.
///
/// Every read hands back a clone, and the iterators clone lazily, one entry
/// per advance rather than snapshotting the whole map up front. Mutating a
/// value obtained from a `SnapshotMap` therefore cannot corrupt the stored
/// copy; the only write path is `insert`.
#[derive(Debug, Clone)]
pub struct SnapshotMap<K, V> {
    inner: HashMap<K, V>,
}

impl<K, V> Default for SnapshotMap<K, V> {
    fn default() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }
}

impl<K, V> SnapshotMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: HashMap::with_capacity(capacity),
        }
    }

    /// Clone of the stored value, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).cloned()
    }

    /// Stores the value, returning the previously stored copy if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Lazily cloning `(K, V)` iterator. Entries are cloned as the iterator
    /// advances, so abandoning it early skips the remaining copies.
    pub fn iter(&self) -> SnapshotIter<'_, K, V> {
        SnapshotIter {
            inner: self.inner.iter(),
        }
    }

    pub fn keys(&self) -> SnapshotKeys<'_, K, V> {
        SnapshotKeys {
            inner: self.inner.keys(),
        }
    }

    pub fn values(&self) -> SnapshotValues<'_, K, V> {
        SnapshotValues {
            inner: self.inner.values(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for SnapshotMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// LAZY ITERATORS
// =============================================================================

pub struct SnapshotIter<'a, K, V> {
    inner: hash_map::Iter<'a, K, V>,
}

impl<K: Clone, V: Clone> Iterator for SnapshotIter<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.clone(), v.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct SnapshotKeys<'a, K, V> {
    inner: hash_map::Keys<'a, K, V>,
}

impl<K: Clone, V> Iterator for SnapshotKeys<'_, K, V> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().cloned()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct SnapshotValues<'a, K, V> {
    inner: hash_map::Values<'a, K, V>,
}

impl<K, V: Clone> Iterator for SnapshotValues<'_, K, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().cloned()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::Value;

    #[test]
    fn reads_hand_back_independent_copies() {
        let mut map: SnapshotMap<i64, Value> = SnapshotMap::new();
        map.insert(1, record! { "name" => "kelly" });

        let mut out = map.get(&1).unwrap();
        out.set_field("name", "sam");

        // The stored copy is unaffected by mutating the read result.
        assert_eq!(
            map.get(&1).unwrap().get("name").and_then(Value::as_str),
            Some("kelly")
        );
    }

    #[test]
    fn insert_returns_previous_copy() {
        let mut map: SnapshotMap<i64, i32> = SnapshotMap::new();
        assert_eq!(map.insert(1, 10), None);
        assert_eq!(map.insert(1, 20), Some(10));
        assert_eq!(map.get(&1), Some(20));
    }

    #[test]
    fn iterators_clone_per_advance() {
        let map: SnapshotMap<i64, String> =
            (0..3).map(|i| (i, format!("v{i}"))).collect();

        let mut keys: Vec<i64> = map.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![0, 1, 2]);

        // A partially consumed iterator is fine; nothing was pre-copied.
        let mut iter = map.iter();
        assert!(iter.next().is_some());
        drop(iter);

        assert_eq!(map.len(), 3);
    }
}
