//! The typed emitter.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle identifying one subscription on an [`Emitter`].
///
/// Returned by [`Emitter::subscribe`]; pass it back to
/// [`Emitter::unsubscribe`] to detach the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Inner<E> {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriberId, Callback<E>)>>,
}

/// A typed publish/subscribe hub.
///
/// Every framelink manager owns one `Emitter` per event type and
/// notifies its listeners synchronously on the caller's task. Clones
/// share the same subscriber list, so a manager can hand out a clone
/// as its listener registration surface.
///
/// # Delivery
///
/// - Synchronous, in subscription order
/// - Callbacks registered *during* an `emit` see only later events
/// - Unsubscribing during an `emit` does not affect the in-flight
///   delivery (the subscriber snapshot was already taken)
///
/// # Example
///
/// ```
/// use framelink_event::Emitter;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let emitter: Emitter<String> = Emitter::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let seen2 = Arc::clone(&seen);
/// let id = emitter.subscribe(move |_msg| {
///     seen2.fetch_add(1, Ordering::SeqCst);
/// });
///
/// emitter.emit(&"ready".to_string());
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
///
/// emitter.unsubscribe(id);
/// emitter.emit(&"ignored".to_string());
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct Emitter<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<E> Emitter<E> {
    /// Creates an emitter with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                subscribers: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Registers a callback and returns its handle.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .write()
            .push((id, Arc::new(callback)));
        id
    }

    /// Detaches a callback. Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self.inner.subscribers.write();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    /// Delivers `event` to every current subscriber.
    ///
    /// Returns the number of callbacks invoked. The subscriber list
    /// is snapshotted before delivery, so callbacks may freely
    /// subscribe/unsubscribe without deadlocking.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<Callback<E>> = {
            let subs = self.inner.subscribers.read();
            subs.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for cb in &snapshot {
            cb(event);
        }
        snapshot.len()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Removes every subscriber.
    pub fn clear(&self) {
        self.inner.subscribers.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn emit_with_no_subscribers_is_noop() {
        let emitter: Emitter<u32> = Emitter::new();
        assert_eq!(emitter.emit(&1), 0);
    }

    #[test]
    fn subscribe_and_emit() {
        let emitter: Emitter<u32> = Emitter::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen2 = Arc::clone(&seen);
        emitter.subscribe(move |v| {
            seen2.fetch_add(*v as usize, Ordering::SeqCst);
        });

        assert_eq!(emitter.emit(&3), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let emitter: Emitter<u32> = Emitter::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen2 = Arc::clone(&seen);
        let id = emitter.subscribe(move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&1);
        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id)); // already gone
        emitter.emit(&1);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delivery_order_is_subscription_order() {
        let emitter: Emitter<()> = Emitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order2 = Arc::clone(&order);
            emitter.subscribe(move |()| {
                order2.lock().unwrap().push(tag);
            });
        }

        emitter.emit(&());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn clones_share_subscribers() {
        let emitter: Emitter<u32> = Emitter::new();
        let clone = emitter.clone();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen2 = Arc::clone(&seen);
        clone.subscribe(move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(clone.subscriber_count(), 1);
    }

    #[test]
    fn subscribing_during_emit_does_not_deadlock() {
        let emitter: Emitter<u32> = Emitter::new();
        let emitter2 = emitter.clone();

        emitter.subscribe(move |_| {
            // Re-entrant subscription from inside a callback.
            emitter2.subscribe(|_| {});
        });

        emitter.emit(&1);
        assert_eq!(emitter.subscriber_count(), 2);
    }

    #[test]
    fn clear_removes_all() {
        let emitter: Emitter<u32> = Emitter::new();
        emitter.subscribe(|_| {});
        emitter.subscribe(|_| {});
        assert_eq!(emitter.subscriber_count(), 2);

        emitter.clear();
        assert_eq!(emitter.subscriber_count(), 0);
        assert_eq!(emitter.emit(&1), 0);
    }
}
