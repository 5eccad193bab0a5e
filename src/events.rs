// ============================================================================
// ripple-store - Change Event Payloads
// ============================================================================

use serde::Serialize;

use crate::change::ChangeType;

/// Opaque attribution tag threaded through write calls, so downstream
/// consumers can tell which subsystem issued a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeContext {
    pub source: String,
}

impl ChangeContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Default for ChangeContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// The raw mutation kind: what the caller did, not what actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MapOp {
    Set,
    Delete,
}

/// Raw event emitted once per mutating call on a reactive map.
///
/// Delete events carry `value: None` with the removed record in
/// `previous_value`, so classification over `(value, previous_value)` yields
/// `Delete` rather than a phantom create.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapStateChange<K, V> {
    pub op: MapOp,
    pub key: K,
    pub value: Option<V>,
    pub previous_value: Option<V>,
    pub context: ChangeContext,
}

/// Actionable event: a raw event that survived change classification.
/// `changes` is present exactly for `Update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChange<K, V> {
    pub change_type: ChangeType,
    pub key: K,
    pub value: Option<V>,
    pub previous_value: Option<V>,
    pub changes: Option<V>,
    pub context: ChangeContext,
}

/// A single tracked property transition on one entity, as projected by the
/// relationship index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyChange<K, P> {
    pub entity_key: K,
    pub current: Option<P>,
    pub previous: Option<P>,
}

// =============================================================================
// EVENT ACCESS TRAITS (seams for the generic stream operators)
// =============================================================================

/// Events addressed to one entity key.
pub trait KeyedEvent<K> {
    fn key(&self) -> &K;
}

/// Events that may carry a current record value.
pub trait ValueCarrier<V> {
    fn value(&self) -> Option<&V>;
}

impl<K, V> KeyedEvent<K> for MapStateChange<K, V> {
    fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V> KeyedEvent<K> for EntityChange<K, V> {
    fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V> ValueCarrier<V> for MapStateChange<K, V> {
    fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }
}

impl<K, V> ValueCarrier<V> for EntityChange<K, V> {
    fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }
}
