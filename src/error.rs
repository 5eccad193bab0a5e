// ============================================================================
// ripple-store - Error Types
// ============================================================================

use thiserror::Error;

/// Terminal signal broadcast to every subscriber of a change stream when the
/// owning map, cell, or store is destroyed.
///
/// Subscribers attached after destruction observe this immediately instead of
/// silently hanging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("change stream destroyed")]
    Destroyed,
}

/// Structural misuse of the store composition root.
///
/// Raised at definition time; single bad calls elsewhere in the crate degrade
/// to sentinel results instead of erroring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("property id already defined: {0}")]
    DuplicateProperty(String),

    #[error("collection id already defined: {0}")]
    DuplicateCollection(String),

    #[error("relationship id already defined: {0}")]
    DuplicateRelationship(String),
}
