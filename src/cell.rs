// ============================================================================
// ripple-store - Entity Cell
// Single-record reactive state with merge semantics
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::change::Diffable;
use crate::error::StreamError;
use crate::stream::{Publisher, Stream};
use crate::value::Value;

/// One applied mutation: the state after the merge, plus the partial
/// record that drove it.
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate<V> {
    pub state: V,
    pub changes: V,
}

/// Reactive state for a single record.
///
/// Where a collection keys many records, a cell holds exactly one and
/// narrates its mutations. Updates deep-merge into the current state;
/// an update that leaves the state unchanged is suppressed entirely.
/// Cheap `Clone` handle like the rest of the toolkit.
pub struct EntityCell<V> {
    state: Rc<RefCell<V>>,
    publisher: Publisher<CellUpdate<V>>,
}

impl<V> Clone for EntityCell<V> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            publisher: self.publisher.clone(),
        }
    }
}

impl<V: Diffable + 'static> EntityCell<V> {
    pub fn new(initial: V) -> Self {
        Self {
            state: Rc::new(RefCell::new(initial)),
            publisher: Publisher::new(),
        }
    }

    /// Clone of the current state.
    pub fn get(&self) -> V {
        self.state.borrow().clone()
    }

    /// Deep-merges the partial record into the state. Returns whether the
    /// state actually moved; a merge that changes nothing emits nothing.
    pub fn update(&self, changes: V) -> bool {
        if self.is_destroyed() {
            warn!("update on destroyed entity cell ignored");
            return false;
        }
        let mut merged = self.get();
        merged.merge(&changes);
        if merged.deep_eq(&self.state.borrow()) {
            return false;
        }
        *self.state.borrow_mut() = merged.clone();
        self.publisher.emit(CellUpdate {
            state: merged,
            changes,
        });
        true
    }

    /// Replaces the state wholesale. The emitted changes are the diff of
    /// the new state against the old one; identical state emits nothing.
    pub fn set(&self, state: V) -> bool {
        if self.is_destroyed() {
            warn!("set on destroyed entity cell ignored");
            return false;
        }
        let changes = {
            let previous = self.state.borrow();
            if state.deep_eq(&previous) {
                return false;
            }
            state.diff_from(&previous)
        };
        *self.state.borrow_mut() = state.clone();
        self.publisher.emit(CellUpdate { state, changes });
        true
    }

    /// One event per applied mutation.
    pub fn updates(&self) -> Stream<CellUpdate<V>> {
        self.publisher.stream()
    }

    /// The state over time: current state replayed to each new observer,
    /// then every post-merge state.
    pub fn watch(&self) -> Stream<V> {
        let cell = self.clone();
        self.publisher
            .stream()
            .map(|update| update.state)
            .prime(move |out| out(cell.get()))
    }

    pub fn destroy(&self) {
        self.publisher.close(StreamError::Destroyed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.publisher.is_closed()
    }
}

impl EntityCell<Value> {
    /// One field of the state over time: replays the field's current
    /// value, then re-emits it whenever an update touches that field.
    pub fn select(&self, field: &str) -> Stream<Value> {
        let field = field.to_string();
        let replay_field = field.clone();
        let cell = self.clone();
        self.publisher
            .stream()
            .filter_map(move |update| {
                if update.changes.get(&field).is_some() {
                    update.state.get(&field).cloned()
                } else {
                    None
                }
            })
            .prime(move |out| {
                if let Some(value) = cell.get().get(&replay_field) {
                    out(value.clone());
                }
            })
    }
}
