// ============================================================================
// ripple-store - Subscription Aggregation
// ============================================================================

use super::publisher::Subscription;

/// Collects subscriptions so a component can tear all of them down at once.
///
/// Dropping the set unsubscribes everything it holds.
///
/// # Example
///
/// ```
/// use ripple_store::stream::{Publisher, SubscriptionSet};
///
/// let numbers: Publisher<i32> = Publisher::new();
/// let mut sink = SubscriptionSet::new();
/// sink.add(numbers.stream().subscribe_next(|_| {}));
/// sink.add(numbers.stream().subscribe_next(|_| {}));
///
/// assert_eq!(sink.len(), 2);
/// sink.unsubscribe_all();
/// assert!(sink.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subscription: Subscription) -> &mut Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Replace the current set: everything held so far is unsubscribed first.
    pub fn set_all(&mut self, subscriptions: impl IntoIterator<Item = Subscription>) -> &mut Self {
        self.unsubscribe_all();
        self.subscriptions.extend(subscriptions);
        self
    }

    /// Unsubscribe and drop every held subscription.
    pub fn unsubscribe_all(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.subscriptions.extend(iter);
    }
}
