// ============================================================================
// ripple-store - Store
// Named composition root for cells, collections and relationships
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cell::EntityCell;
use crate::change::Diffable;
use crate::error::StoreError;
use crate::maps::{EntityCollection, MapBacking, OpenMap};
use crate::relationships::OneToManyIndex;

/// A registry that wires cells, collections and relationship indexes
/// together under stable string ids and tears them all down with one call.
///
/// The store is purely compositional: members behave exactly as they do
/// standalone, the store only names them, hands out typed handles and owns
/// their lifecycle. Ids are unique per kind; redefining one is an error
/// rather than a silent replacement.
///
/// Cheap `Clone` handle; clones share the registry.
pub struct Store {
    inner: Rc<StoreInner>,
}

struct StoreInner {
    properties: RefCell<FxHashMap<String, Box<dyn Any>>>,
    collections: RefCell<FxHashMap<String, Box<dyn Any>>>,
    relationships: RefCell<FxHashMap<String, Box<dyn Any>>>,
    teardown: RefCell<Vec<Box<dyn Fn()>>>,
    destroyed: Cell<bool>,
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                properties: RefCell::new(FxHashMap::default()),
                collections: RefCell::new(FxHashMap::default()),
                relationships: RefCell::new(FxHashMap::default()),
                teardown: RefCell::new(Vec::new()),
                destroyed: Cell::new(false),
            }),
        }
    }

    // ========================================================================
    // PROPERTIES
    // ========================================================================

    /// Defines a named single-record cell seeded with `initial`.
    pub fn define_property<V: Diffable + 'static>(
        &self,
        id: &str,
        initial: V,
    ) -> Result<EntityCell<V>, StoreError> {
        let mut properties = self.inner.properties.borrow_mut();
        if properties.contains_key(id) {
            return Err(StoreError::DuplicateProperty(id.to_string()));
        }
        debug!(id, "defining store property");
        let cell = EntityCell::new(initial);
        properties.insert(id.to_string(), Box::new(cell.clone()));
        let member = cell.clone();
        self.inner
            .teardown
            .borrow_mut()
            .push(Box::new(move || member.destroy()));
        Ok(cell)
    }

    /// Typed handle to a defined property. `None` when the id is unknown
    /// or was defined with a different value type.
    pub fn property<V: Diffable + 'static>(&self, id: &str) -> Option<EntityCell<V>> {
        self.inner
            .properties
            .borrow()
            .get(id)
            .and_then(|member| member.downcast_ref::<EntityCell<V>>())
            .cloned()
    }

    // ========================================================================
    // COLLECTIONS
    // ========================================================================

    /// Defines a named snapshot-backed collection keyed by `select_key`.
    pub fn define_collection<K, V>(
        &self,
        id: &str,
        select_key: impl Fn(&V) -> Option<K> + 'static,
    ) -> Result<EntityCollection<K, V>, StoreError>
    where
        K: Eq + Hash + Clone + 'static,
        V: Diffable + 'static,
    {
        self.register_collection(id, EntityCollection::new(select_key))
    }

    /// Same as [`define_collection`] with the clone-free open backing.
    ///
    /// [`define_collection`]: Store::define_collection
    pub fn define_mutable_collection<K, V>(
        &self,
        id: &str,
        select_key: impl Fn(&V) -> Option<K> + 'static,
    ) -> Result<EntityCollection<K, V, OpenMap<K, V>>, StoreError>
    where
        K: Eq + Hash + Clone + 'static,
        V: Diffable + 'static,
    {
        self.register_collection(id, EntityCollection::mutable(select_key))
    }

    fn register_collection<K, V, S>(
        &self,
        id: &str,
        collection: EntityCollection<K, V, S>,
    ) -> Result<EntityCollection<K, V, S>, StoreError>
    where
        K: Eq + Hash + Clone + 'static,
        V: Diffable + 'static,
        S: MapBacking<K, V> + 'static,
    {
        let mut collections = self.inner.collections.borrow_mut();
        if collections.contains_key(id) {
            return Err(StoreError::DuplicateCollection(id.to_string()));
        }
        debug!(id, "defining store collection");
        collections.insert(id.to_string(), Box::new(collection.clone()));
        let member = collection.clone();
        self.inner
            .teardown
            .borrow_mut()
            .push(Box::new(move || member.destroy()));
        Ok(collection)
    }

    /// Typed handle to a defined collection. The backing type is part of
    /// the identity: a collection defined mutable comes back only as
    /// `EntityCollection<K, V, OpenMap<K, V>>`.
    pub fn collection<K, V, S>(&self, id: &str) -> Option<EntityCollection<K, V, S>>
    where
        K: Eq + Hash + Clone + 'static,
        V: Diffable + 'static,
        S: MapBacking<K, V> + 'static,
    {
        self.inner
            .collections
            .borrow()
            .get(id)
            .and_then(|member| member.downcast_ref::<EntityCollection<K, V, S>>())
            .cloned()
    }

    // ========================================================================
    // RELATIONSHIPS
    // ========================================================================

    /// Defines a named one-to-many index over an already defined (or
    /// standalone) collection.
    pub fn define_one_to_many<K, V, P, S>(
        &self,
        id: &str,
        collection: &EntityCollection<K, V, S>,
        select_owner: impl Fn(&V) -> Option<P> + 'static,
    ) -> Result<OneToManyIndex<K, V, P, S>, StoreError>
    where
        K: Eq + Hash + Clone + 'static,
        V: Diffable + 'static,
        P: Eq + Hash + Clone + 'static,
        S: MapBacking<K, V> + 'static,
    {
        let mut relationships = self.inner.relationships.borrow_mut();
        if relationships.contains_key(id) {
            return Err(StoreError::DuplicateRelationship(id.to_string()));
        }
        debug!(id, "defining store relationship");
        let index = OneToManyIndex::new(collection, select_owner);
        relationships.insert(id.to_string(), Box::new(index.clone()));
        let member = index.clone();
        self.inner
            .teardown
            .borrow_mut()
            .push(Box::new(move || member.destroy()));
        Ok(index)
    }

    pub fn one_to_many<K, V, P, S>(&self, id: &str) -> Option<OneToManyIndex<K, V, P, S>>
    where
        K: Eq + Hash + Clone + 'static,
        V: Diffable + 'static,
        P: Eq + Hash + Clone + 'static,
        S: MapBacking<K, V> + 'static,
    {
        self.inner
            .relationships
            .borrow()
            .get(id)
            .and_then(|member| member.downcast_ref::<OneToManyIndex<K, V, P, S>>())
            .cloned()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Destroys every defined member in reverse definition order, then
    /// forgets them. Idempotent.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        debug!(
            properties = self.inner.properties.borrow().len(),
            collections = self.inner.collections.borrow().len(),
            relationships = self.inner.relationships.borrow().len(),
            "destroying store"
        );
        let teardown = std::mem::take(&mut *self.inner.teardown.borrow_mut());
        for destroy in teardown.iter().rev() {
            destroy();
        }
        self.inner.properties.borrow_mut().clear();
        self.inner.collections.borrow_mut().clear();
        self.inner.relationships.borrow_mut().clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::Value;

    #[test]
    fn properties_round_trip_by_id_and_type() {
        let store = Store::new();
        let cell = store
            .define_property("session", record! { "user" => "kelly" })
            .unwrap();

        let fetched: EntityCell<Value> = store.property("session").unwrap();
        cell.update(record! { "user" => "sam" });
        assert_eq!(
            fetched.get().get("user").and_then(Value::as_str),
            Some("sam")
        );

        assert!(store.property::<Value>("missing").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected_per_kind() {
        let store = Store::new();
        store.define_property("a", record! {}).unwrap();
        let err = store
            .define_property("a", record! {})
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateProperty("a".into()));

        store
            .define_collection("users", |v: &Value| v.get("id").and_then(Value::as_i64))
            .unwrap();
        assert!(matches!(
            store.define_collection("users", |v: &Value| v
                .get("id")
                .and_then(Value::as_i64)),
            Err(StoreError::DuplicateCollection(_))
        ));

        // Kinds have separate namespaces.
        store
            .define_collection("a", |v: &Value| v.get("id").and_then(Value::as_i64))
            .unwrap();
    }

    #[test]
    fn collection_lookup_is_typed() {
        let store = Store::new();
        store
            .define_collection("users", |v: &Value| v.get("id").and_then(Value::as_i64))
            .unwrap();

        let users: EntityCollection<i64, Value> = store.collection("users").unwrap();
        users.set_one(record! { "id" => 1 });
        assert_eq!(users.len(), 1);

        // Wrong key type comes back as None, not a panic.
        let wrong: Option<EntityCollection<String, Value>> = store.collection("users");
        assert!(wrong.is_none());
    }

    #[test]
    fn relationships_compose_with_collections() {
        let store = Store::new();
        let tracks = store
            .define_collection("tracks", |v: &Value| v.get("id").and_then(Value::as_i64))
            .unwrap();
        let by_album = store
            .define_one_to_many("tracks_by_album", &tracks, |v: &Value| {
                v.get("album_id").and_then(Value::as_i64)
            })
            .unwrap();

        tracks.set_one(record! { "id" => 1, "album_id" => 10 });
        assert_eq!(by_album.related_keys(&10), vec![1]);

        let fetched: OneToManyIndex<i64, Value, i64> =
            store.one_to_many("tracks_by_album").unwrap();
        assert!(fetched.has_association(&10, &1));
    }

    #[test]
    fn destroy_tears_down_every_member_once() {
        let store = Store::new();
        let cell = store.define_property("p", record! {}).unwrap();
        let col = store
            .define_collection("c", |v: &Value| v.get("id").and_then(Value::as_i64))
            .unwrap();

        store.destroy();
        store.destroy();

        assert!(store.is_destroyed());
        assert!(cell.is_destroyed());
        assert!(col.is_destroyed());
        assert!(store.property::<Value>("p").is_none());
    }
}
