// ============================================================================
// ripple-store - Map Backing Capability
// The storage seam between a reactive map and its container
// ============================================================================

use std::collections::HashMap;
use std::hash::Hash;

use super::snapshot::SnapshotMap;

/// The associative-container capability a [`ReactiveMap`] needs from its
/// backing storage. Reads hand back owned values, so external code never
/// holds a reference that aliases live internal state.
///
/// Variants are selected at construction time: [`SnapshotMap`] is the safe
/// default, [`OpenMap`] the fast path.
///
/// [`ReactiveMap`]: crate::maps::ReactiveMap
pub trait MapBacking<K, V> {
    fn get(&self, key: &K) -> Option<V>;
    fn insert(&mut self, key: K, value: V) -> Option<V>;
    fn remove(&mut self, key: &K) -> Option<V>;
    fn contains_key(&self, key: &K) -> bool;
    fn clear(&mut self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialized key list; iteration order is incidental, not contracted.
    fn keys(&self) -> Vec<K>;
    fn values(&self) -> Vec<V>;
    fn entries(&self) -> Vec<(K, V)>;
}

impl<K, V> MapBacking<K, V> for SnapshotMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        SnapshotMap::get(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        SnapshotMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        SnapshotMap::remove(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        SnapshotMap::contains_key(self, key)
    }

    fn clear(&mut self) {
        SnapshotMap::clear(self)
    }

    fn len(&self) -> usize {
        SnapshotMap::len(self)
    }

    fn keys(&self) -> Vec<K> {
        SnapshotMap::keys(self).collect()
    }

    fn values(&self) -> Vec<V> {
        SnapshotMap::values(self).collect()
    }

    fn entries(&self) -> Vec<(K, V)> {
        SnapshotMap::iter(self).collect()
    }
}

// =============================================================================
// OPEN MAP (the unsafe fast path)
// =============================================================================

/// Plain `HashMap` backing with none of the snapshot map's copy discipline
/// at the iteration boundary.
///
/// Use via [`EntityCollection::mutable`] when record cloning cost matters
/// more than the safety net; if it doesn't, use the default backing.
///
/// [`EntityCollection::mutable`]: crate::maps::EntityCollection::mutable
#[derive(Debug, Clone)]
pub struct OpenMap<K, V> {
    inner: HashMap<K, V>,
}

impl<K, V> Default for OpenMap<K, V> {
    fn default() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }
}

impl<K, V> OpenMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Borrow the underlying map directly.
    pub fn raw(&self) -> &HashMap<K, V> {
        &self.inner
    }
}

impl<K, V> MapBacking<K, V> for OpenMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn keys(&self) -> Vec<K> {
        self.inner.keys().cloned().collect()
    }

    fn values(&self) -> Vec<V> {
        self.inner.values().cloned().collect()
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
