// ============================================================================
// ripple-store - Diffable Records
// The seam between store machinery and record shapes
// ============================================================================

use crate::value::{Fields, Value};

/// A record type the change pipeline can compare, diff, and merge.
///
/// The partial/"changes" representation is the record type itself: for
/// [`Value`] a diff is an object holding only the changed fields, for plain
/// structs (see [`shallow_diffable!`](crate::shallow_diffable)) it is the
/// whole replacement value.
pub trait Diffable: Clone {
    /// Structural equality. For dynamic values this must be NaN-aware and
    /// walk the union of keys on both sides.
    fn deep_eq(&self, other: &Self) -> bool;

    /// The parts of `self` that differ from `previous`.
    ///
    /// For object values: exactly the fields of `self` whose value changed,
    /// recursing where both sides hold nested objects and taking the full
    /// current value otherwise. Fields present only in `previous` are not
    /// represented; deletions are expressed as explicit `Null` fields.
    fn diff_from(&self, previous: &Self) -> Self;

    /// Deep-merge `changes` into `self`: object fields combine key-by-key,
    /// anything else is replaced wholesale.
    fn merge(&mut self, changes: &Self);

    /// Whether this value counts as "absent" for change classification.
    /// Only dynamic null-like values override this.
    fn is_nil(&self) -> bool {
        false
    }
}

impl Diffable for Value {
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn diff_from(&self, previous: &Self) -> Self {
        match (self, previous) {
            (Value::Object(current), Value::Object(prev)) => {
                let mut changed = Fields::new();
                for (key, value) in current {
                    let before = prev.get(key).unwrap_or(&Value::Null);
                    if value == before {
                        continue;
                    }
                    let entry = if value.is_object() && before.is_object() {
                        value.diff_from(before)
                    } else {
                        value.clone()
                    };
                    changed.insert(key.clone(), entry);
                }
                Value::Object(changed)
            }
            _ => self.clone(),
        }
    }

    fn merge(&mut self, changes: &Self) {
        match (self, changes) {
            (Value::Object(base), Value::Object(patch)) => {
                for (key, incoming) in patch {
                    match base.get_mut(key) {
                        Some(slot) if slot.is_object() && incoming.is_object() => {
                            slot.merge(incoming);
                        }
                        _ => {
                            base.insert(key.clone(), incoming.clone());
                        }
                    }
                }
            }
            (slot, other) => *slot = other.clone(),
        }
    }

    fn is_nil(&self) -> bool {
        self.is_null()
    }
}

// =============================================================================
// TESTS
// =============================================================================
