// ============================================================================
// ripple-store - Reactive Map
// Keyed store that narrates every mutation on two streams
// ============================================================================

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::change::{Diffable, detect_changes};
use crate::error::StreamError;
use crate::events::{ChangeContext, EntityChange, MapOp, MapStateChange};
use crate::maps::{MapBacking, SnapshotMap};
use crate::stream::{Publisher, Stream};

/// A keyed value store that publishes every mutation.
///
/// Two streams hang off the map: [`all_changes`] carries one raw event per
/// write, mutation or not, while [`changes`] runs each write through change
/// detection and only forwards the actionable ones, annotated with a
/// change type and a diff.
///
/// The map is a cheap `Clone` handle; clones share storage and streams.
/// Storage behavior is pluggable through [`MapBacking`]; the default
/// [`SnapshotMap`] backing guarantees reads never alias live state.
///
/// [`all_changes`]: ReactiveMap::all_changes
/// [`changes`]: ReactiveMap::changes
pub struct ReactiveMap<K, V, S = SnapshotMap<K, V>> {
    source: Rc<RefCell<S>>,
    raw: Publisher<MapStateChange<K, V>>,
    actionable: Publisher<EntityChange<K, V>>,
}

impl<K, V, S> Clone for ReactiveMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            raw: self.raw.clone(),
            actionable: self.actionable.clone(),
        }
    }
}

impl<K, V, S> ReactiveMap<K, V, S>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
    S: MapBacking<K, V> + 'static,
{
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::with_source(S::default())
    }

    /// Wraps pre-populated storage. No events are emitted for the seed
    /// entries; the streams narrate mutations from this point on.
    pub fn with_source(source: S) -> Self {
        Self {
            source: Rc::new(RefCell::new(source)),
            raw: Publisher::new(),
            actionable: Publisher::new(),
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn get(&self, key: &K) -> Option<V> {
        self.source.borrow().get(key)
    }

    pub fn has(&self, key: &K) -> bool {
        self.source.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.source.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.source.borrow().keys()
    }

    pub fn values(&self) -> Vec<V> {
        self.source.borrow().values()
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        self.source.borrow().entries()
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    pub fn set(&self, key: K, value: V) {
        self.set_with_context(key, value, ChangeContext::default());
    }

    pub fn set_with_context(&self, key: K, value: V, context: ChangeContext) {
        if self.is_destroyed() {
            warn!(source = %context.source, "write on destroyed reactive map ignored");
            return;
        }
        let previous = {
            let mut source = self.source.borrow_mut();
            source.insert(key.clone(), value.clone())
        };
        self.publish(MapOp::Set, key, Some(value), previous, context);
    }

    /// Removes the entry. The raw stream always carries the delete event,
    /// present key or not; change detection classifies a miss as NoChange,
    /// so the actionable stream stays quiet for it.
    pub fn delete(&self, key: &K) -> bool {
        self.delete_with_context(key, ChangeContext::default())
    }

    pub fn delete_with_context(&self, key: &K, context: ChangeContext) -> bool {
        if self.is_destroyed() {
            warn!(source = %context.source, "delete on destroyed reactive map ignored");
            return false;
        }
        let previous = self.source.borrow_mut().remove(key);
        let existed = previous.is_some();
        self.publish(MapOp::Delete, key.clone(), None, previous, context);
        existed
    }

    /// Deletes every entry, one observable delete event per key.
    pub fn clear(&self) {
        self.clear_with_context(ChangeContext::default());
    }

    pub fn clear_with_context(&self, context: ChangeContext) {
        for key in self.keys() {
            self.delete_with_context(&key, context.clone());
        }
    }

    fn publish(
        &self,
        op: MapOp,
        key: K,
        value: Option<V>,
        previous_value: Option<V>,
        context: ChangeContext,
    ) {
        let event = MapStateChange {
            op,
            key,
            value,
            previous_value,
            context,
        };
        self.raw.emit(event.clone());

        // Detection is skipped entirely while nobody watches the
        // actionable stream.
        if self.actionable.observer_count() == 0 {
            return;
        }
        let detection =
            detect_changes(event.value.as_ref(), event.previous_value.as_ref());
        if !detection.change_type.is_actionable() {
            return;
        }
        self.actionable.emit(EntityChange {
            change_type: detection.change_type,
            key: event.key,
            value: event.value,
            previous_value: event.previous_value,
            changes: detection.changes,
            context: event.context,
        });
    }

    // ========================================================================
    // STREAMS & LIFECYCLE
    // ========================================================================

    /// One event per write, including writes that changed nothing.
    pub fn all_changes(&self) -> Stream<MapStateChange<K, V>> {
        self.raw.stream()
    }

    /// Detected creates, updates and deletes only.
    pub fn changes(&self) -> Stream<EntityChange<K, V>> {
        self.actionable.stream()
    }

    /// Closes both streams, notifying every observer exactly once.
    /// Idempotent; the stored entries stay readable afterwards.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        debug!(entries = self.len(), "destroying reactive map");
        self.actionable.close(StreamError::Destroyed);
        self.raw.close(StreamError::Destroyed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.raw.is_closed()
    }
}

impl<K, V, S> Default for ReactiveMap<K, V, S>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
    S: MapBacking<K, V> + Default + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
