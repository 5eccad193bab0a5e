// ============================================================================
// ripple-store - One-To-Many Index
// Owner-key index maintained live from a collection's change stream
// ============================================================================

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::change::Diffable;
use crate::events::PropertyChange;
use crate::maps::{EntityCollection, MapBacking, SnapshotMap};
use crate::relationships::RelationContext;
use crate::stream::{Emission, Publisher, Stream, Subscription};

/// Selects the owner key a record belongs under, `None` for unowned.
pub type OwnerSelector<V, P> = Rc<dyn Fn(&V) -> Option<P>>;

/// A live index from an owner key to the entity keys that reference it.
///
/// The index subscribes to the collection's actionable change stream at
/// construction and keeps itself current from then on: a create files the
/// new key under its owner, an update whose owner field moved re-files it,
/// a delete removes it. Events whose owner field did not move are skipped.
/// Existing entries are indexed once up front.
///
/// Every re-filing is republished as a [`PropertyChange`] so observers can
/// follow membership without re-deriving it.
pub struct OneToManyIndex<K, V, P, S = SnapshotMap<K, V>> {
    collection: EntityCollection<K, V, S>,
    select_owner: OwnerSelector<V, P>,
    contexts: Rc<RefCell<FxHashMap<P, RelationContext<P, K>>>>,
    publisher: Publisher<PropertyChange<K, P>>,
    _feed: Rc<Subscription>,
}

impl<K, V, P, S> Clone for OneToManyIndex<K, V, P, S> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            select_owner: Rc::clone(&self.select_owner),
            contexts: Rc::clone(&self.contexts),
            publisher: self.publisher.clone(),
            _feed: Rc::clone(&self._feed),
        }
    }
}

impl<K, V, P, S> OneToManyIndex<K, V, P, S>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
    P: Eq + Hash + Clone + 'static,
    S: MapBacking<K, V> + 'static,
{
    pub fn new(
        collection: &EntityCollection<K, V, S>,
        select_owner: impl Fn(&V) -> Option<P> + 'static,
    ) -> Self {
        let select_owner: OwnerSelector<V, P> = Rc::new(select_owner);
        let contexts: Rc<RefCell<FxHashMap<P, RelationContext<P, K>>>> =
            Rc::new(RefCell::new(FxHashMap::default()));
        let publisher: Publisher<PropertyChange<K, P>> = Publisher::new();

        // Index whatever the collection already holds, silently.
        for (key, entity) in collection.entries() {
            if let Some(owner) = select_owner(&entity) {
                Self::file_under(&contexts, &owner, key);
            }
        }

        let feed = {
            let contexts = Rc::clone(&contexts);
            let select_owner = Rc::clone(&select_owner);
            let publisher = publisher.clone();
            collection.changes().subscribe(move |emission| match emission {
                Emission::Next(event) => {
                    let previous = event
                        .previous_value
                        .as_ref()
                        .and_then(|value| select_owner(value));
                    let current =
                        event.value.as_ref().and_then(|value| select_owner(value));
                    if previous == current {
                        return;
                    }
                    if let Some(owner) = &previous {
                        if let Some(context) = contexts.borrow().get(owner) {
                            context.disassociate(&event.key);
                        }
                    }
                    if let Some(owner) = &current {
                        Self::file_under(&contexts, owner, event.key.clone());
                    }
                    publisher.emit(PropertyChange {
                        entity_key: event.key,
                        current,
                        previous,
                    });
                }
                Emission::Closed(error) => publisher.close(error),
            })
        };

        Self {
            collection: collection.clone(),
            select_owner,
            contexts,
            publisher,
            _feed: Rc::new(feed),
        }
    }

    fn file_under(
        contexts: &Rc<RefCell<FxHashMap<P, RelationContext<P, K>>>>,
        owner: &P,
        key: K,
    ) {
        contexts
            .borrow_mut()
            .entry(owner.clone())
            .or_insert_with(|| RelationContext::new(owner.clone()))
            .associate(key);
    }

    /// Runs the owner selector against a record.
    pub fn owner_of(&self, entity: &V) -> Option<P> {
        (self.select_owner)(entity)
    }

    // ========================================================================
    // MANUAL EDITS
    // ========================================================================

    /// Files a key under an owner by hand, creating the owner's context
    /// if needed. Returns false when the key was already filed there.
    pub fn associate(&self, owner: &P, key: K) -> bool {
        let context = self.context(owner);
        context.associate(key)
    }

    /// Removes a key from an owner's context. Never creates the context;
    /// returns false when owner or key were not indexed.
    pub fn disassociate(&self, owner: &P, key: &K) -> bool {
        match self.contexts.borrow().get(owner) {
            Some(context) => context.disassociate(key),
            None => false,
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Keys filed under this owner; empty when the owner is unknown.
    /// Reads peek at the index without creating a context.
    pub fn related_keys(&self, owner: &P) -> Vec<K> {
        self.contexts
            .borrow()
            .get(owner)
            .map(RelationContext::keys)
            .unwrap_or_default()
    }

    /// The related records themselves, read back through the collection.
    /// Keys whose record has since vanished are skipped.
    pub fn related_values(&self, owner: &P) -> Vec<V> {
        self.collection.get_many_existing(&self.related_keys(owner))
    }

    pub fn key_count(&self, owner: &P) -> usize {
        self.contexts
            .borrow()
            .get(owner)
            .map(RelationContext::len)
            .unwrap_or(0)
    }

    pub fn has_association(&self, owner: &P, key: &K) -> bool {
        self.contexts
            .borrow()
            .get(owner)
            .is_some_and(|context| context.contains(key))
    }

    pub fn has_any_association(&self, owner: &P) -> bool {
        self.key_count(owner) > 0
    }

    pub fn owners(&self) -> Vec<P> {
        self.contexts.borrow().keys().cloned().collect()
    }

    // ========================================================================
    // CONTEXTS
    // ========================================================================

    /// The owner's live context, created on first request. The returned
    /// handle shares state with the index.
    pub fn context(&self, owner: &P) -> RelationContext<P, K> {
        self.contexts
            .borrow_mut()
            .entry(owner.clone())
            .or_insert_with(|| RelationContext::new(owner.clone()))
            .clone()
    }

    /// Drops the owner's context and its memberships.
    pub fn remove_context(&self, owner: &P) -> bool {
        self.contexts.borrow_mut().remove(owner).is_some()
    }

    /// Empties every context, then forgets them. Contexts handed out
    /// earlier observe the emptying.
    pub fn clear(&self) {
        let mut contexts = self.contexts.borrow_mut();
        for context in contexts.values() {
            context.clear();
        }
        contexts.clear();
    }

    // ========================================================================
    // STREAMS & LIFECYCLE
    // ========================================================================

    /// Re-filings as they happen: one event per key whose owner moved,
    /// carrying the owner it left and the owner it joined.
    pub fn changes(&self) -> Stream<PropertyChange<K, P>> {
        self.publisher.stream()
    }

    /// Re-filings touching one owner, either as the side being left or
    /// the side being joined, as per-key membership deltas.
    pub fn membership_changes(&self, owner: &P) -> Stream<PropertyChange<K, P>> {
        let filter_owner = owner.clone();
        self.publisher
            .stream()
            .filter(move |event: &PropertyChange<K, P>| {
                event.current.as_ref() == Some(&filter_owner)
                    || event.previous.as_ref() == Some(&filter_owner)
            })
    }

    /// Live view of an owner's related records: replays the current set
    /// once to each new observer, then re-reads it whenever a key is
    /// filed into or out of the owner's bucket.
    pub fn watch_owner(&self, owner: &P) -> Stream<Vec<V>> {
        let reader = self.clone();
        let read_owner = owner.clone();
        let replay = self.clone();
        let replay_owner = owner.clone();
        self.membership_changes(owner)
            .map(move |_| reader.related_values(&read_owner))
            .prime(move |out| out(replay.related_values(&replay_owner)))
    }

    /// Closes the change stream. Idempotent; the index stops following
    /// the collection but stays readable.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        debug!(owners = self.contexts.borrow().len(), "destroying one-to-many index");
        self.publisher.close(crate::error::StreamError::Destroyed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.publisher.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::Value;
    use std::cell::RefCell;

    fn tracks() -> EntityCollection<i64, Value> {
        EntityCollection::new(|v: &Value| v.get("id").and_then(Value::as_i64))
    }

    fn by_album(
        collection: &EntityCollection<i64, Value>,
    ) -> OneToManyIndex<i64, Value, i64> {
        OneToManyIndex::new(collection, |v: &Value| {
            v.get("album_id").and_then(Value::as_i64)
        })
    }

    #[test]
    fn indexes_creates_under_their_owner() {
        let col = tracks();
        let index = by_album(&col);

        col.set_one(record! { "id" => 1, "album_id" => 10 });
        col.set_one(record! { "id" => 2, "album_id" => 10 });
        col.set_one(record! { "id" => 3, "album_id" => 20 });

        let mut keys = index.related_keys(&10);
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(index.key_count(&20), 1);
        assert!(index.has_association(&10, &1));
        assert!(!index.has_association(&20, &1));
    }

    #[test]
    fn existing_entries_are_indexed_at_construction() {
        let col = tracks();
        col.set_one(record! { "id" => 1, "album_id" => 10 });

        let index = by_album(&col);
        assert_eq!(index.related_keys(&10), vec![1]);
    }

    #[test]
    fn owner_moves_are_refiled_and_republished() {
        let col = tracks();
        let index = by_album(&col);
        col.set_one(record! { "id" => 1, "album_id" => 10 });

        let seen: Rc<RefCell<Vec<PropertyChange<i64, i64>>>> =
            Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = index
            .changes()
            .subscribe_next(move |event| sink.borrow_mut().push(event));

        col.upsert_one(record! { "id" => 1, "album_id" => 20 });

        assert!(!index.has_association(&10, &1));
        assert!(index.has_association(&20, &1));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].entity_key, 1);
        assert_eq!(seen[0].previous, Some(10));
        assert_eq!(seen[0].current, Some(20));
    }

    #[test]
    fn updates_without_an_owner_move_are_skipped() {
        let col = tracks();
        let index = by_album(&col);
        col.set_one(record! { "id" => 1, "album_id" => 10, "title" => "a" });

        let seen = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&seen);
        let _sub = index
            .changes()
            .subscribe_next(move |_| *counter.borrow_mut() += 1);

        col.upsert_one(record! { "id" => 1, "title" => "b" });
        assert_eq!(*seen.borrow(), 0);
        assert!(index.has_association(&10, &1));
    }

    #[test]
    fn deletes_unfile_the_key() {
        let col = tracks();
        let index = by_album(&col);
        col.set_one(record! { "id" => 1, "album_id" => 10 });

        col.remove_one(&1);
        assert!(!index.has_any_association(&10));
    }

    #[test]
    fn converges_under_fk_rewrites() {
        let col = tracks();
        let index = by_album(&col);

        col.set_one(record! { "id" => 0, "album_id" => 1 });
        col.set_one(record! { "id" => 1, "album_id" => 1 });
        col.set_one(record! { "id" => 2, "album_id" => 2 });
        col.set_one(record! { "id" => 0, "album_id" => 2 });

        let mut under_two = index.related_keys(&2);
        under_two.sort_unstable();
        assert_eq!(index.related_keys(&1), vec![1]);
        assert_eq!(under_two, vec![0, 2]);
    }

    #[test]
    fn related_values_skip_vanished_records() {
        let col = tracks();
        let index = by_album(&col);
        col.set_one(record! { "id" => 1, "album_id" => 10 });
        col.set_one(record! { "id" => 2, "album_id" => 10 });

        index.associate(&10, 99);
        assert_eq!(index.key_count(&10), 3);
        assert_eq!(index.related_values(&10).len(), 2);
    }

    #[test]
    fn disassociate_never_creates_a_context() {
        let col = tracks();
        let index = by_album(&col);

        assert!(!index.disassociate(&10, &1));
        assert!(index.owners().is_empty());

        assert!(index.related_keys(&10).is_empty());
        assert!(index.owners().is_empty());
    }

    #[test]
    fn context_handles_stay_live() {
        let col = tracks();
        let index = by_album(&col);
        let ctx = index.context(&10);
        assert!(ctx.is_empty());

        col.set_one(record! { "id" => 1, "album_id" => 10 });
        assert!(ctx.contains(&1));

        index.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn watch_owner_replays_the_current_set_once() {
        let col = tracks();
        let index = by_album(&col);
        col.set_one(record! { "id" => 1, "album_id" => 10 });
        col.set_one(record! { "id" => 2, "album_id" => 10 });

        let seen: Rc<RefCell<Vec<Vec<Value>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = index
            .watch_owner(&10)
            .subscribe_next(move |values| sink.borrow_mut().push(values));

        // Two members replay as one set emission, not one per member.
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].len(), 2);
    }

    #[test]
    fn watch_owner_recomputes_on_qualifying_refilings() {
        let col = tracks();
        let index = by_album(&col);
        col.set_one(record! { "id" => 1, "album_id" => 10 });

        let seen: Rc<RefCell<Vec<Vec<Value>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = index
            .watch_owner(&10)
            .subscribe_next(move |values| sink.borrow_mut().push(values));

        assert_eq!(seen.borrow().len(), 1);

        // Another owner's traffic does not qualify.
        col.set_one(record! { "id" => 2, "album_id" => 20 });
        assert_eq!(seen.borrow().len(), 1);

        // A key joining and a key leaving both recompute the set.
        col.set_one(record! { "id" => 3, "album_id" => 10 });
        col.upsert_one(record! { "id" => 1, "album_id" => 20 });
        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].len(), 2);
        assert_eq!(seen[2].len(), 1);
        assert_eq!(seen[2][0].get("id").and_then(Value::as_i64), Some(3));
    }

    #[test]
    fn membership_changes_carry_the_refiling_delta() {
        let col = tracks();
        let index = by_album(&col);
        col.set_one(record! { "id" => 1, "album_id" => 10 });

        let seen: Rc<RefCell<Vec<PropertyChange<i64, i64>>>> =
            Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = index
            .membership_changes(&10)
            .subscribe_next(move |event| sink.borrow_mut().push(event));

        col.set_one(record! { "id" => 2, "album_id" => 20 });
        assert!(seen.borrow().is_empty());

        col.upsert_one(record! { "id" => 1, "album_id" => 20 });
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].entity_key, 1);
        assert_eq!(seen[0].previous, Some(10));
        assert_eq!(seen[0].current, Some(20));
    }

    #[test]
    fn collection_destroy_closes_the_index_stream() {
        let col = tracks();
        let index = by_album(&col);

        let closed = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&closed);
        let _sub = index.changes().subscribe(move |emission| {
            if matches!(emission, Emission::Closed(_)) {
                *flag.borrow_mut() = true;
            }
        });

        col.destroy();
        assert!(*closed.borrow());
        assert!(index.is_destroyed());
    }
}
