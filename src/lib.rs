// ============================================================================
// ripple-store - A Reactive Entity Store Toolkit for Rust
// ============================================================================
//
// In-memory keyed stores that narrate their own mutations: reactive maps,
// change detection with structural diffs, entity collections, single-record
// cells, live one-to-many indexes, and a store to compose them under names.
// ============================================================================

pub mod cell;
pub mod change;
pub mod error;
pub mod events;
pub mod maps;
pub mod relationships;
pub mod store;
pub mod stream;
pub mod value;

mod macros;

// Re-export the working surface at crate root for ergonomic access
pub use cell::{CellUpdate, EntityCell};
pub use change::{ChangeDetection, ChangeType, Diffable, detect_changes};
pub use error::{StoreError, StreamError};
pub use events::{
    ChangeContext, EntityChange, KeyedEvent, MapOp, MapStateChange, PropertyChange,
    ValueCarrier,
};
pub use maps::{
    DuplexEntityCollection, EntityCollection, KeySelector, MapBacking, OpenMap,
    ReactiveMap, SnapshotMap, Update,
};
pub use relationships::{OneToManyIndex, OwnerSelector, RelationContext};
pub use store::Store;
pub use stream::{
    ChangeAccumulation, Emission, Publisher, Stream, Subscription, SubscriptionSet,
    accumulate_changes, capture_into, capture_many_into, for_key, for_key_in,
    of_change_type, of_op, pluck_changes, pluck_value,
};
pub use value::{Fields, Value};

// =============================================================================
// TESTS
// =============================================================================
