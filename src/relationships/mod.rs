// ============================================================================
// ripple-store - Relationships
// Live cross-entity indexes
// ============================================================================

mod context;
mod one_to_many;

pub use context::RelationContext;
pub use one_to_many::{OneToManyIndex, OwnerSelector};
