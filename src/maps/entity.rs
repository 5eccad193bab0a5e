// ============================================================================
// ripple-store - Entity Collection
// Record-keyed CRUD over a reactive map
// ============================================================================

use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::warn;

use crate::change::Diffable;
use crate::events::{EntityChange, MapStateChange};
use crate::maps::{MapBacking, OpenMap, ReactiveMap, SnapshotMap};
use crate::stream::Stream;

/// Extracts the key a record is stored under. Returning `None` marks the
/// record unkeyable; writes for it are dropped with a warning.
pub type KeySelector<K, V> = Rc<dyn Fn(&V) -> Option<K>>;

/// A partial-record update addressed at a key.
#[derive(Debug, Clone, PartialEq)]
pub struct Update<K, V> {
    pub key: K,
    pub changes: V,
}

impl<K, V> Update<K, V> {
    pub fn new(key: K, changes: V) -> Self {
        Self { key, changes }
    }
}

/// A collection of records keyed by a field of the record itself.
///
/// Wraps a [`ReactiveMap`] with a key selector so callers pass whole
/// records instead of key/value pairs, and layers CRUD verbs, batch
/// variants and live `watch_*` streams on top. Like the map it wraps,
/// the collection is a cheap `Clone` handle.
///
/// [`new`] uses the snapshot backing; [`mutable`] trades that safety net
/// for clone-free storage.
///
/// [`new`]: EntityCollection::new
/// [`mutable`]: EntityCollection::mutable
pub struct EntityCollection<K, V, S = SnapshotMap<K, V>> {
    map: ReactiveMap<K, V, S>,
    select_key: KeySelector<K, V>,
}

impl<K, V, S> Clone for EntityCollection<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            select_key: Rc::clone(&self.select_key),
        }
    }
}

impl<K, V> EntityCollection<K, V, SnapshotMap<K, V>>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
{
    pub fn new(select_key: impl Fn(&V) -> Option<K> + 'static) -> Self {
        Self::with_map(ReactiveMap::new(), select_key)
    }
}

impl<K, V> EntityCollection<K, V, OpenMap<K, V>>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
{
    /// Collection backed by a plain map without the snapshot copy
    /// discipline.
    pub fn mutable(select_key: impl Fn(&V) -> Option<K> + 'static) -> Self {
        Self::with_map(ReactiveMap::new(), select_key)
    }
}

impl<K, V, S> EntityCollection<K, V, S>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
    S: MapBacking<K, V> + 'static,
{
    pub fn with_map(
        map: ReactiveMap<K, V, S>,
        select_key: impl Fn(&V) -> Option<K> + 'static,
    ) -> Self {
        Self {
            map,
            select_key: Rc::new(select_key),
        }
    }

    /// The reactive map underneath, for key/value access and contexts.
    pub fn map(&self) -> &ReactiveMap<K, V, S> {
        &self.map
    }

    /// Runs the key selector against a record.
    pub fn key_of(&self, entity: &V) -> Option<K> {
        (self.select_key)(entity)
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn get_one(&self, key: &K) -> Option<V> {
        self.map.get(key)
    }

    /// One slot per requested key, `None` where the key is absent.
    /// Order follows the request.
    pub fn get_many(&self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.map.get(key)).collect()
    }

    /// Like [`get_many`] but with the absent slots dropped.
    ///
    /// [`get_many`]: EntityCollection::get_many
    pub fn get_many_existing(&self, keys: &[K]) -> Vec<V> {
        keys.iter().filter_map(|key| self.map.get(key)).collect()
    }

    pub fn has_one(&self, key: &K) -> bool {
        self.map.has(key)
    }

    /// True when every requested key is present; vacuously true for an
    /// empty request.
    pub fn has_every(&self, keys: &[K]) -> bool {
        keys.iter().all(|key| self.map.has(key))
    }

    /// True when any requested key is present; vacuously false for an
    /// empty request.
    pub fn has_some(&self, keys: &[K]) -> bool {
        keys.iter().any(|key| self.map.has(key))
    }

    pub fn keys(&self) -> Vec<K> {
        self.map.keys()
    }

    pub fn values(&self) -> Vec<V> {
        self.map.values()
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        self.map.entries()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    // ========================================================================
    // SET / ADD
    // ========================================================================

    /// Stores the record under its selected key, replacing whatever was
    /// there. Returns the key, or `None` when the record is unkeyable.
    pub fn set_one(&self, entity: V) -> Option<K> {
        match self.key_of(&entity) {
            Some(key) => {
                self.map.set(key.clone(), entity);
                Some(key)
            }
            None => {
                warn!("record without a key dropped");
                None
            }
        }
    }

    pub fn set_many(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        entities
            .into_iter()
            .filter_map(|entity| self.set_one(entity))
            .collect()
    }

    /// Replaces the whole collection: clears every current entry, then
    /// stores the given records.
    pub fn set_all(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        self.remove_all();
        self.set_many(entities)
    }

    /// Merge-style insert; see [`upsert_one`].
    ///
    /// [`upsert_one`]: EntityCollection::upsert_one
    pub fn add_one(&self, entity: V) -> Option<K> {
        self.upsert_one(entity)
    }

    pub fn add_many(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        self.upsert_many(entities)
    }

    // ========================================================================
    // UPDATE / UPSERT
    // ========================================================================

    /// Deep-merges the partial record into the stored one and writes the
    /// result back. Absent key: the changes become the stored record.
    /// Returns the merged record.
    pub fn update_one(&self, update: Update<K, V>) -> V {
        let Update { key, changes } = update;
        let merged = match self.map.get(&key) {
            Some(mut existing) => {
                existing.merge(&changes);
                existing
            }
            None => changes,
        };
        self.map.set(key, merged.clone());
        merged
    }

    pub fn update_many(
        &self,
        updates: impl IntoIterator<Item = Update<K, V>>,
    ) -> Vec<V> {
        updates
            .into_iter()
            .map(|update| self.update_one(update))
            .collect()
    }

    /// Keys the record itself, then merges it into the stored one.
    /// Returns the key, or `None` when the record is unkeyable.
    pub fn upsert_one(&self, entity: V) -> Option<K> {
        match self.key_of(&entity) {
            Some(key) => {
                self.update_one(Update::new(key.clone(), entity));
                Some(key)
            }
            None => {
                warn!("record without a key dropped");
                None
            }
        }
    }

    pub fn upsert_many(&self, entities: impl IntoIterator<Item = V>) -> Vec<K> {
        entities
            .into_iter()
            .filter_map(|entity| self.upsert_one(entity))
            .collect()
    }

    /// Rewrites the stored record through a function. No-op when the key
    /// is absent. Returns the merged record that was written.
    pub fn transform_one(&self, key: &K, transform: impl FnOnce(&V) -> V) -> Option<V> {
        let current = self.map.get(key)?;
        let changes = transform(&current);
        Some(self.update_one(Update::new(key.clone(), changes)))
    }

    /// Applies the transform to every stored record.
    pub fn transform_many(&self, mut transform: impl FnMut(&V) -> V) -> Vec<V> {
        self.entries()
            .into_iter()
            .map(|(key, current)| {
                let changes = transform(&current);
                self.update_one(Update::new(key, changes))
            })
            .collect()
    }

    // ========================================================================
    // REMOVE
    // ========================================================================

    /// Removes the entry, returning the stored record if it existed.
    pub fn remove_one(&self, key: &K) -> Option<V> {
        let removed = self.map.get(key);
        self.map.delete(key);
        removed
    }

    /// One slot per requested key: the removed record, or `None` where
    /// the key was absent. Order follows the request.
    pub fn remove_many(&self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.remove_one(key)).collect()
    }

    /// Removes every record the predicate matches, returning the removed
    /// records.
    pub fn remove_where(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        self.entries()
            .into_iter()
            .filter(|(_, entity)| predicate(entity))
            .map(|(key, entity)| {
                self.map.delete(&key);
                entity
            })
            .collect()
    }

    pub fn remove_all(&self) {
        self.map.clear();
    }

    // ========================================================================
    // STREAMS & LIFECYCLE
    // ========================================================================

    /// Live view of one record: replays the current value to each new
    /// observer, then forwards the value carried by every actionable
    /// change at that key. A delete carries no value, so the stream goes
    /// quiet for it; pair with [`changes`] when delete notifications
    /// matter.
    ///
    /// [`changes`]: EntityCollection::changes
    pub fn watch_one(&self, key: &K) -> Stream<V> {
        let replay = self.clone();
        let replay_key = key.clone();
        let filter_key = key.clone();
        self.changes()
            .filter_map(move |event| {
                if event.key == filter_key {
                    event.value
                } else {
                    None
                }
            })
            .prime(move |out| {
                if let Some(current) = replay.get_one(&replay_key) {
                    out(current);
                }
            })
    }

    /// Live view of a key subset: replays the present members to each new
    /// observer, then re-reads the subset whenever one of its keys
    /// changes. Emitted in request order, absent keys skipped.
    pub fn watch_many(&self, keys: &[K]) -> Stream<Vec<V>> {
        let wanted: FxHashSet<K> = keys.iter().cloned().collect();
        let requested: Vec<K> = keys.to_vec();
        let reader = self.clone();
        let replay = self.clone();
        let replay_keys = requested.clone();
        self.changes()
            .filter(move |event| wanted.contains(&event.key))
            .map(move |_| reader.get_many_existing(&requested))
            .prime(move |out| out(replay.get_many_existing(&replay_keys)))
    }

    /// Live view of the whole collection, re-read on every actionable
    /// change.
    pub fn watch_all(&self) -> Stream<Vec<V>> {
        let reader = self.clone();
        let replay = self.clone();
        self.changes()
            .map(move |_| reader.values())
            .prime(move |out| out(replay.values()))
    }

    pub fn all_changes(&self) -> Stream<MapStateChange<K, V>> {
        self.map.all_changes()
    }

    pub fn changes(&self) -> Stream<EntityChange<K, V>> {
        self.map.changes()
    }

    pub fn destroy(&self) {
        self.map.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.map.is_destroyed()
    }
}
