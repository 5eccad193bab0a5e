// ============================================================================
// ripple-store - Stream Operators
// Combinators over change-event streams
// ============================================================================

use std::cell::RefCell;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::change::{ChangeType, Diffable, detect_changes};
use crate::events::{EntityChange, KeyedEvent, MapOp, MapStateChange, ValueCarrier};
use crate::maps::{EntityCollection, MapBacking};

use super::publisher::Stream;

/// Keep only raw events whose mutation kind is in `ops`.
pub fn of_op<K, V>(
    stream: &Stream<MapStateChange<K, V>>,
    ops: &[MapOp],
) -> Stream<MapStateChange<K, V>>
where
    K: Clone + 'static,
    V: Clone + 'static,
{
    let lookup: FxHashSet<MapOp> = ops.iter().copied().collect();
    stream.filter(move |ev| lookup.contains(&ev.op))
}

/// Keep only actionable events whose classification is in `types`.
/// Useful when a consumer only cares about e.g. creates and updates.
pub fn of_change_type<K, V>(
    stream: &Stream<EntityChange<K, V>>,
    types: &[ChangeType],
) -> Stream<EntityChange<K, V>>
where
    K: Clone + 'static,
    V: Clone + 'static,
{
    let lookup: FxHashSet<ChangeType> = types.iter().copied().collect();
    stream.filter(move |ev| lookup.contains(&ev.change_type))
}

/// Keep only events addressed to a single entity key.
pub fn for_key<K, E>(stream: &Stream<E>, key: K) -> Stream<E>
where
    K: PartialEq + 'static,
    E: KeyedEvent<K> + Clone + 'static,
{
    stream.filter(move |ev| *ev.key() == key)
}

/// Keep only events addressed to one of `keys`.
///
/// Builds a hash set up front so per-event membership checks stay constant
/// time; worth it once the key list stops being tiny.
pub fn for_key_in<K, E>(stream: &Stream<E>, keys: &[K]) -> Stream<E>
where
    K: Eq + Hash + Clone + 'static,
    E: KeyedEvent<K> + Clone + 'static,
{
    let lookup: FxHashSet<K> = keys.iter().cloned().collect();
    stream.filter(move |ev| lookup.contains(ev.key()))
}

/// Project events to their current record value, dropping events that have
/// none (deletes).
pub fn pluck_value<V, E>(stream: &Stream<E>) -> Stream<V>
where
    V: Clone + 'static,
    E: ValueCarrier<V> + Clone + 'static,
{
    stream.filter_map(|ev| ev.value().cloned())
}

/// Project actionable events to their update diff, dropping events that have
/// none (creates and deletes).
pub fn pluck_changes<K, V>(stream: &Stream<EntityChange<K, V>>) -> Stream<V>
where
    K: Clone + 'static,
    V: Clone + 'static,
{
    stream.filter_map(|ev| ev.changes)
}

/// One step of [`accumulate_changes`]: the detection result plus the rolling
/// state it was computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeAccumulation<V> {
    pub change_type: ChangeType,
    pub changes: Option<V>,
    pub current: V,
    pub previous: Option<V>,
}

/// Run change detection between each emission and the one before it,
/// dropping steps that classify as no-change.
///
/// This generalizes the map pipeline to arbitrary value streams: watching a
/// scalar property becomes "diff every emission against the previous one".
pub fn accumulate_changes<V>(stream: &Stream<V>) -> Stream<ChangeAccumulation<V>>
where
    V: Diffable + 'static,
{
    let rolling: RefCell<Option<V>> = RefCell::new(None);
    stream.filter_map(move |current| {
        let previous = rolling.replace(Some(current.clone()));
        let detection = detect_changes(Some(&current), previous.as_ref());
        detection
            .change_type
            .is_actionable()
            .then_some(ChangeAccumulation {
                change_type: detection.change_type,
                changes: detection.changes,
                current,
                previous,
            })
    })
}

/// Store every emitted record into `collection` by side effect, passing the
/// record through. The collection keeps its own copy via its key selector.
pub fn capture_into<K, V, S>(
    stream: &Stream<V>,
    collection: &EntityCollection<K, V, S>,
) -> Stream<V>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
    S: MapBacking<K, V> + 'static,
{
    let collection = collection.clone();
    stream.map(move |record| {
        collection.set_one(record.clone());
        record
    })
}

/// Batch variant of [`capture_into`] for streams of record lists.
pub fn capture_many_into<K, V, S>(
    stream: &Stream<Vec<V>>,
    collection: &EntityCollection<K, V, S>,
) -> Stream<Vec<V>>
where
    K: Eq + Hash + Clone + 'static,
    V: Diffable + 'static,
    S: MapBacking<K, V> + 'static,
{
    let collection = collection.clone();
    stream.map(move |records| {
        collection.set_many(records.clone());
        records
    })
}

// =============================================================================
// TESTS
// =============================================================================
