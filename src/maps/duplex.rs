// ============================================================================
// ripple-store - Duplex Entity Collection
// Desired/reported collection pair segregating intent from confirmed state
// ============================================================================

use std::hash::Hash;
use std::rc::Rc;

use crate::change::Diffable;
use crate::maps::{EntityCollection, KeySelector, MapBacking, SnapshotMap, Update};

/// A pair of collections over one record shape: `desired` holds what the
/// caller asked for, `reported` holds what the backing system confirmed.
///
/// The split keeps in-flight requests from masquerading as settled state:
/// mutating verbs write to `desired`, reads answer from `reported`, and
/// confirmations land in `reported` directly as they arrive. Both halves
/// share one key selector, so a record keys identically on either side.
/// Each half keeps its own change streams; subscribe to the one whose
/// traffic you care about.
pub struct DuplexEntityCollection<K, V, S = SnapshotMap<K, V>> {
    pub desired: EntityCollection<K, V, S>,
    pub reported: EntityCollection<K, V, S>,
}

impl<K, V, S> Clone for DuplexEntityCollection<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            desired: self.desired.clone(),
            reported: self.reported.clone(),
        }
    }
}

impl<K, V> DuplexEntityCollection<K, V, SnapshotMap<K, V>>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
{
    pub fn new(select_key: impl Fn(&V) -> Option<K> + 'static) -> Self {
        let select: KeySelector<K, V> = Rc::new(select_key);
        let desired_select = Rc::clone(&select);
        Self {
            desired: EntityCollection::new(move |entity: &V| desired_select(entity)),
            reported: EntityCollection::new(move |entity: &V| select(entity)),
        }
    }
}

impl<K, V, S> DuplexEntityCollection<K, V, S>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
    S: MapBacking<K, V> + 'static,
{
    /// Pairs two existing collections. They should share a key selector;
    /// nothing here reconciles disagreeing ones.
    pub fn with_collections(
        desired: EntityCollection<K, V, S>,
        reported: EntityCollection<K, V, S>,
    ) -> Self {
        Self { desired, reported }
    }

    /// Runs the key selector against a record.
    pub fn key_of(&self, entity: &V) -> Option<K> {
        self.reported.key_of(entity)
    }

    // ========================================================================
    // READS (reported side)
    // ========================================================================

    pub fn get_one(&self, key: &K) -> Option<V> {
        self.reported.get_one(key)
    }

    pub fn get_many(&self, keys: &[K]) -> Vec<Option<V>> {
        self.reported.get_many(keys)
    }

    pub fn get_many_existing(&self, keys: &[K]) -> Vec<V> {
        self.reported.get_many_existing(keys)
    }

    pub fn has_one(&self, key: &K) -> bool {
        self.reported.has_one(key)
    }

    pub fn has_every(&self, keys: &[K]) -> bool {
        self.reported.has_every(keys)
    }

    pub fn has_some(&self, keys: &[K]) -> bool {
        self.reported.has_some(keys)
    }

    pub fn keys(&self) -> Vec<K> {
        self.reported.keys()
    }

    pub fn values(&self) -> Vec<V> {
        self.reported.values()
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        self.reported.entries()
    }

    pub fn len(&self) -> usize {
        self.reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }

    // ========================================================================
    // WRITES (desired side)
    // ========================================================================

    pub fn set_one(&self, entity: V) -> Option<K> {
        self.desired.set_one(entity)
    }

    pub fn set_many(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        self.desired.set_many(entities)
    }

    pub fn set_all(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        self.desired.set_all(entities)
    }

    pub fn add_one(&self, entity: V) -> Option<K> {
        self.desired.add_one(entity)
    }

    pub fn add_many(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        self.desired.add_many(entities)
    }

    pub fn update_one(&self, update: Update<K, V>) -> V {
        self.desired.update_one(update)
    }

    pub fn update_many(
        &self,
        updates: impl IntoIterator<Item = Update<K, V>>,
    ) -> Vec<V> {
        self.desired.update_many(updates)
    }

    pub fn upsert_one(&self, entity: V) -> Option<K> {
        self.desired.upsert_one(entity)
    }

    pub fn upsert_many(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        self.desired.upsert_many(entities)
    }

    pub fn transform_one(&self, key: &K, transform: impl FnOnce(&V) -> V) -> Option<V> {
        self.desired.transform_one(key, transform)
    }

    pub fn transform_many(&self, transform: impl FnMut(&V) -> V) -> Vec<V> {
        self.desired.transform_many(transform)
    }

    pub fn remove_one(&self, key: &K) -> Option<V> {
        self.desired.remove_one(key)
    }

    pub fn remove_many(&self, keys: &[K]) -> Vec<Option<V>> {
        self.desired.remove_many(keys)
    }

    pub fn remove_where(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        self.desired.remove_where(predicate)
    }

    pub fn remove_all(&self) {
        self.desired.remove_all()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Destroys both halves.
    pub fn destroy(&self) {
        self.desired.destroy();
        self.reported.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.desired.is_destroyed() && self.reported.is_destroyed()
    }
}
