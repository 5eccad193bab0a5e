// ============================================================================
// ripple-store - Change Detection Module
// Structural comparison, minimal diffs, and transition classification
// ============================================================================

mod detect;
mod diff;

pub use detect::{ChangeDetection, ChangeType, detect_changes};
pub use diff::Diffable;
