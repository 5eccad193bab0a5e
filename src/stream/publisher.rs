// ============================================================================
// ripple-store - Synchronous Multicast Streams
// Observer-registry broadcast with explicit terminal state
// ============================================================================
//
// No scheduler and no buffering: emitting delivers to every live subscriber
// inside the calling stack frame, in registration order. The only replay
// semantic is the optional per-stream "prime" hook used by the watch_*
// helpers to hand the current state to each new subscriber.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::StreamError;

/// One delivery to a subscriber: a value, or the terminal error state.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission<T> {
    Next(T),
    Closed(StreamError),
}

type Callback<T> = Box<dyn FnMut(Emission<T>)>;
type PrimeFn<T> = Box<dyn Fn(&mut dyn FnMut(T))>;

struct Subscriber<T> {
    id: u64,
    active: Cell<bool>,
    callback: RefCell<Callback<T>>,
}

pub(crate) struct StreamCore<T> {
    subscribers: RefCell<Vec<Rc<Subscriber<T>>>>,
    next_id: Cell<u64>,
    closed: Cell<Option<StreamError>>,
    /// Replays current state into each newly attached subscriber.
    prime: RefCell<Option<PrimeFn<T>>>,
    /// Keepalive links from derived streams to their sources.
    upstream: RefCell<Vec<Subscription>>,
}

impl<T: Clone + 'static> StreamCore<T> {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            closed: Cell::new(None),
            prime: RefCell::new(None),
            upstream: RefCell::new(Vec::new()),
        })
    }

    fn emit(&self, value: T) {
        if self.closed.get().is_some() {
            return;
        }
        // Snapshot first so handlers can subscribe/unsubscribe mid-delivery
        let snapshot: Vec<_> = self.subscribers.borrow().clone();
        for sub in snapshot {
            if !sub.active.get() {
                continue;
            }
            // A handler that writes back into the source it watches re-enters
            // here; the already-running callback is skipped, which bounds the
            // recursion.
            if let Ok(mut callback) = sub.callback.try_borrow_mut() {
                callback(Emission::Next(value.clone()));
            }
        }
    }

    fn close(&self, error: StreamError) {
        if self.closed.get().is_some() {
            return;
        }
        self.closed.set(Some(error));
        self.prime.replace(None);
        self.upstream.borrow_mut().clear();
        let snapshot: Vec<_> = self.subscribers.borrow_mut().drain(..).collect();
        for sub in snapshot {
            if !sub.active.get() {
                continue;
            }
            sub.active.set(false);
            if let Ok(mut callback) = sub.callback.try_borrow_mut() {
                callback(Emission::Closed(error));
            }
        }
    }

    fn subscribe(self: &Rc<Self>, handler: impl FnMut(Emission<T>) + 'static) -> Subscription {
        if let Some(error) = self.closed.get() {
            let mut handler = handler;
            handler(Emission::Closed(error));
            return Subscription::completed();
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let sub = Rc::new(Subscriber {
            id,
            active: Cell::new(true),
            callback: RefCell::new(Box::new(handler)),
        });
        self.subscribers.borrow_mut().push(sub.clone());

        if let Some(prime) = self.prime.borrow().as_ref() {
            let mut deliver = |value: T| {
                if sub.active.get() {
                    if let Ok(mut callback) = sub.callback.try_borrow_mut() {
                        callback(Emission::Next(value));
                    }
                }
            };
            prime(&mut deliver);
        }

        // The handle keeps the core alive: derived chains have no other
        // strong holder once the intermediate Stream values are dropped.
        let core = Rc::clone(self);
        Subscription::new(move || core.unsubscribe(id))
    }

    fn unsubscribe(&self, id: u64) {
        let mut subscribers = self.subscribers.borrow_mut();
        if let Some(pos) = subscribers.iter().position(|s| s.id == id) {
            subscribers[pos].active.set(false);
            subscribers.remove(pos);
        }
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle for one active subscription.
///
/// Dropping the handle unsubscribes, so keep it alive for as long as the
/// handler should run:
///
/// ```
/// use ripple_store::stream::Publisher;
///
/// let numbers: Publisher<i32> = Publisher::new();
/// let _sub = numbers.stream().subscribe_next(|n| println!("{n}"));
/// numbers.emit(1); // delivered while _sub is alive
/// ```
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that is already over (e.g. the stream was closed).
    pub fn completed() -> Self {
        Self { cancel: None }
    }

    /// Stop receiving emissions now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Leave the handler attached for the lifetime of the stream.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}

// =============================================================================
// PUBLISHER (emit side)
// =============================================================================

/// The emitting side of a multicast stream.
pub struct Publisher<T> {
    core: Rc<StreamCore<T>>,
}

impl<T: Clone + 'static> Publisher<T> {
    pub fn new() -> Self {
        Self {
            core: StreamCore::new(),
        }
    }

    /// Deliver `value` synchronously to every current subscriber, in
    /// registration order. No-op once closed.
    pub fn emit(&self, value: T) {
        self.core.emit(value);
    }

    /// Broadcast the terminal error and drop all subscribers. Idempotent.
    pub fn close(&self, error: StreamError) {
        self.core.close(error);
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.get().is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.core.subscribers.borrow().len()
    }

    /// The subscribe side, sharing this publisher's core.
    pub fn stream(&self) -> Stream<T> {
        Stream {
            core: self.core.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

// =============================================================================
// STREAM (subscribe side)
// =============================================================================

/// The subscribe side of a multicast stream.
pub struct Stream<T> {
    core: Rc<StreamCore<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Attach a handler observing every emission including the terminal one.
    pub fn subscribe(&self, handler: impl FnMut(Emission<T>) + 'static) -> Subscription {
        self.core.subscribe(handler)
    }

    /// Attach a handler observing values only.
    pub fn subscribe_next(&self, mut handler: impl FnMut(T) + 'static) -> Subscription {
        self.subscribe(move |emission| {
            if let Emission::Next(value) = emission {
                handler(value);
            }
        })
    }

    /// Build a downstream stream fed by `apply`.
    ///
    /// The downstream holds its upstream subscription alive; the upstream
    /// only reaches the downstream through a weak reference, so dropping all
    /// downstream handles tears the link down.
    pub fn derive<U: Clone + 'static>(
        &self,
        mut apply: impl FnMut(Emission<T>, &Publisher<U>) + 'static,
    ) -> Stream<U> {
        let downstream: Publisher<U> = Publisher::new();
        let weak = Rc::downgrade(&downstream.core);
        let link = self.subscribe(move |emission| {
            if let Some(core) = weak.upgrade() {
                apply(emission, &Publisher { core });
            }
        });
        downstream.core.upstream.borrow_mut().push(link);
        downstream.stream()
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        self.derive(move |emission, out| match emission {
            Emission::Next(value) => {
                if predicate(&value) {
                    out.emit(value);
                }
            }
            Emission::Closed(error) => out.close(error),
        })
    }

    pub fn map<U: Clone + 'static>(&self, mut f: impl FnMut(T) -> U + 'static) -> Stream<U> {
        self.derive(move |emission, out| match emission {
            Emission::Next(value) => out.emit(f(value)),
            Emission::Closed(error) => out.close(error),
        })
    }

    pub fn filter_map<U: Clone + 'static>(
        &self,
        mut f: impl FnMut(T) -> Option<U> + 'static,
    ) -> Stream<U> {
        self.derive(move |emission, out| match emission {
            Emission::Next(value) => {
                if let Some(mapped) = f(value) {
                    out.emit(mapped);
                }
            }
            Emission::Closed(error) => out.close(error),
        })
    }

    /// Install a replay hook: `produce` runs once per new subscriber, feeding
    /// it the current state before any live emissions.
    pub fn prime(self, produce: impl Fn(&mut dyn FnMut(T)) + 'static) -> Stream<T> {
        *self.core.prime.borrow_mut() = Some(Box::new(produce));
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn collect<T: Clone + 'static>(stream: &Stream<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = stream.subscribe_next(move |v| sink.borrow_mut().push(v));
        (seen, sub)
    }

    #[test]
    fn delivers_in_registration_order() {
        let publisher = Publisher::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = order.clone();
        let _a = publisher
            .stream()
            .subscribe_next(move |v: i32| first.borrow_mut().push(("a", v)));
        let second = order.clone();
        let _b = publisher
            .stream()
            .subscribe_next(move |v: i32| second.borrow_mut().push(("b", v)));

        publisher.emit(1);
        publisher.emit(2);
        assert_eq!(
            *order.borrow(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]
        );
    }

    #[test]
    fn no_retroactive_delivery() {
        let publisher = Publisher::new();
        publisher.emit(1);
        let (seen, _sub) = collect(&publisher.stream());
        publisher.emit(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let publisher = Publisher::new();
        let (seen, sub) = collect(&publisher.stream());
        publisher.emit(1);
        sub.unsubscribe();
        publisher.emit(2);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let publisher = Publisher::new();
        let (seen, sub) = collect(&publisher.stream());
        publisher.emit(1);
        drop(sub);
        publisher.emit(2);
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(publisher.observer_count(), 0);
    }

    #[test]
    fn close_is_terminal_and_idempotent() {
        let publisher: Publisher<i32> = Publisher::new();
        let closes = Rc::new(RefCell::new(0));
        let counter = closes.clone();
        let _sub = publisher.stream().subscribe(move |emission| {
            if matches!(emission, Emission::Closed(_)) {
                *counter.borrow_mut() += 1;
            }
        });

        publisher.close(StreamError::Destroyed);
        publisher.close(StreamError::Destroyed);
        publisher.emit(1);

        assert_eq!(*closes.borrow(), 1);
        assert!(publisher.is_closed());
    }

    #[test]
    fn subscribe_after_close_sees_the_terminal_state() {
        let publisher: Publisher<i32> = Publisher::new();
        publisher.close(StreamError::Destroyed);

        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let _sub = publisher.stream().subscribe(move |emission| {
            *sink.borrow_mut() = Some(emission);
        });
        assert_eq!(
            *seen.borrow(),
            Some(Emission::Closed(StreamError::Destroyed))
        );
    }

    #[test]
    fn filter_and_map_compose() {
        let publisher = Publisher::new();
        let doubled_evens = publisher.stream().filter(|v| v % 2 == 0).map(|v| v * 2);
        let (seen, _sub) = collect(&doubled_evens);

        for n in 1..=4 {
            publisher.emit(n);
        }
        assert_eq!(*seen.borrow(), vec![4, 8]);
    }

    #[test]
    fn derived_streams_propagate_close() {
        let publisher: Publisher<i32> = Publisher::new();
        let derived = publisher.stream().map(|v| v + 1);

        let closed = Rc::new(RefCell::new(false));
        let flag = closed.clone();
        let _sub = derived.subscribe(move |emission| {
            if matches!(emission, Emission::Closed(_)) {
                *flag.borrow_mut() = true;
            }
        });

        publisher.close(StreamError::Destroyed);
        assert!(*closed.borrow());
    }

    #[test]
    fn prime_replays_to_each_new_subscriber() {
        let publisher = Publisher::new();
        let primed = publisher.stream().prime(|out| out(0));

        let (first, _a) = collect(&primed);
        assert_eq!(*first.borrow(), vec![0]);

        publisher.emit(5);
        let (second, _b) = collect(&primed);
        assert_eq!(*first.borrow(), vec![0, 5]);
        assert_eq!(*second.borrow(), vec![0]);
    }

    #[test]
    fn reentrant_emission_skips_the_running_handler() {
        let publisher = Publisher::new();
        let echo = publisher.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        // Echoes every value back into its own source; without the guard
        // this would recurse forever.
        let _sub = publisher.stream().subscribe_next(move |v: i32| {
            sink.borrow_mut().push(v);
            if v < 10 {
                echo.emit(v + 1);
            }
        });

        publisher.emit(1);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn subscriber_added_mid_emission_misses_that_emission() {
        let publisher: Publisher<i32> = Publisher::new();
        let late_values = Rc::new(RefCell::new(Vec::new()));

        let stream = publisher.stream();
        let late_sink = late_values.clone();
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
        let held_clone = held.clone();
        let _sub = publisher.stream().subscribe_next(move |v: i32| {
            if v == 1 {
                let sink = late_sink.clone();
                let late = stream.subscribe_next(move |v| sink.borrow_mut().push(v));
                held_clone.borrow_mut().push(late);
            }
        });

        publisher.emit(1);
        publisher.emit(2);
        assert_eq!(*late_values.borrow(), vec![2]);
    }
}
