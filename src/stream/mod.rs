// ============================================================================
// ripple-store - Stream Module
// Synchronous multicast change feeds and their combinators
// ============================================================================

mod operators;
mod publisher;
mod sink;

pub use operators::{
    ChangeAccumulation, accumulate_changes, capture_into, capture_many_into, for_key, for_key_in,
    of_change_type, of_op, pluck_changes, pluck_value,
};
pub use publisher::{Emission, Publisher, Stream, Subscription};
pub use sink::SubscriptionSet;
