// ============================================================================
// ripple-store - Change Detection
// Classifies transitions between two optional record states
// ============================================================================

use serde::Serialize;

use super::diff::Diffable;

/// Classification of a transition between two states of one record slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeType {
    Create,
    Update,
    Delete,
    /// Structurally equal before and after; suppressed from actionable
    /// change streams.
    NoChange,
}

impl ChangeType {
    /// Whether downstream consumers should hear about this transition.
    pub fn is_actionable(self) -> bool {
        self != ChangeType::NoChange
    }
}

/// Result of classifying one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDetection<V> {
    pub change_type: ChangeType,
    /// Present exactly for `Update`: the fields of the current value that
    /// differ from the previous one.
    pub changes: Option<V>,
}

impl<V> ChangeDetection<V> {
    fn of(change_type: ChangeType) -> Self {
        Self {
            change_type,
            changes: None,
        }
    }
}

/// Classify the transition from `previous` to `current` and compute the
/// minimal diff for updates.
///
/// Pure: never mutates either argument, never fails on well-formed input.
/// A `None` slot and a nil value (e.g. `Value::Null`) both count as absent,
/// and two absent states compare equal.
///
/// ```
/// use ripple_store::change::{detect_changes, ChangeType};
/// use ripple_store::record;
///
/// let prev = record! { "a" => 1, "b" => 2 };
/// let cur = record! { "a" => 1, "b" => 3 };
///
/// let detection = detect_changes(Some(&cur), Some(&prev));
/// assert_eq!(detection.change_type, ChangeType::Update);
/// assert_eq!(detection.changes, Some(record! { "b" => 3 }));
/// ```
pub fn detect_changes<V: Diffable>(
    current: Option<&V>,
    previous: Option<&V>,
) -> ChangeDetection<V> {
    let cur = current.filter(|v| !v.is_nil());
    let prev = previous.filter(|v| !v.is_nil());

    match (cur, prev) {
        (None, None) => ChangeDetection::of(ChangeType::NoChange),
        (Some(_), None) => ChangeDetection::of(ChangeType::Create),
        (None, Some(_)) => ChangeDetection::of(ChangeType::Delete),
        (Some(c), Some(p)) => {
            if c.deep_eq(p) {
                ChangeDetection::of(ChangeType::NoChange)
            } else {
                ChangeDetection {
                    change_type: ChangeType::Update,
                    changes: Some(c.diff_from(p)),
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
