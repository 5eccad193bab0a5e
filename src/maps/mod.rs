// ============================================================================
// ripple-store - Maps
// Reactive keyed storage: backings, the reactive map, entity collections
// ============================================================================

mod backing;
mod duplex;
mod entity;
mod reactive;
mod snapshot;

pub use backing::{MapBacking, OpenMap};
pub use duplex::DuplexEntityCollection;
pub use entity::{EntityCollection, KeySelector, Update};
pub use reactive::ReactiveMap;
pub use snapshot::{SnapshotIter, SnapshotKeys, SnapshotMap, SnapshotValues};
