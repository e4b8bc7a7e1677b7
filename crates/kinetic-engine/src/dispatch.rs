//! Shared fan-out dispatcher for host signals and engine broadcasts.
//!
//! One `Dispatcher` per signal type replaces a listener per component
//! instance. Subscribers are closures; the returned [`Subscription`]
//! unsubscribes when released or dropped, and releasing is safe from inside
//! the subscriber's own callback.
//!
//! ```
//! use kinetic_engine::dispatch::Dispatcher;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let resize: Dispatcher<f32> = Dispatcher::new();
//! let seen = Rc::new(Cell::new(0.0));
//! let sink = seen.clone();
//! let mut sub = resize.subscribe(move |height| sink.set(*height));
//!
//! resize.emit(&720.0);
//! assert_eq!(seen.get(), 720.0);
//!
//! sub.unsubscribe();
//! resize.emit(&1080.0);
//! assert_eq!(seen.get(), 720.0);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Callback<E> = Box<dyn FnMut(&E)>;

struct Slot<E> {
    id: u64,
    /// `None` while the callback is running.
    callback: Option<Callback<E>>,
}

struct Inner<E> {
    next_id: u64,
    slots: Vec<Slot<E>>,
}

/// Single-threaded publish/subscribe channel.
pub struct Dispatcher<E> {
    inner: Rc<RefCell<Inner<E>>>,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for Dispatcher<E> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next_id: 1,
                slots: Vec::new(),
            })),
        }
    }
}

impl<E: 'static> std::fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<E: 'static> Dispatcher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&E) + 'static,
    {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.slots.push(Slot {
                id,
                callback: Some(Box::new(callback)),
            });
            id
        };

        let weak: Weak<RefCell<Inner<E>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().slots.retain(|slot| slot.id != id);
            }
        })
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// Subscribers added during delivery receive the next event, not this one.
    /// A subscriber is never re-entered by a nested `emit`.
    pub fn emit(&self, event: &E) {
        let ids: Vec<u64> = self.inner.borrow().slots.iter().map(|s| s.id).collect();

        for id in ids {
            let callback = {
                let mut inner = self.inner.borrow_mut();
                inner
                    .slots
                    .iter_mut()
                    .find(|s| s.id == id)
                    .and_then(|s| s.callback.take())
            };
            let Some(mut callback) = callback else {
                continue;
            };

            callback(event);

            let mut inner = self.inner.borrow_mut();
            if let Some(slot) = inner.slots.iter_mut().find(|s| s.id == id) {
                slot.callback = Some(callback);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }
}

/// Handle to a registered subscriber or listener.
///
/// `unsubscribe` is idempotent; dropping the handle unsubscribes too.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
    active: Rc<Cell<bool>>,
}

impl Subscription {
    /// Wrap an arbitrary cleanup action.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
            active: Rc::new(Cell::new(true)),
        }
    }

    pub fn unsubscribe(&mut self) {
        self.active.set(false);
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_in_order() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        let _a = dispatcher.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let l2 = log.clone();
        let _b = dispatcher.subscribe(move |v| l2.borrow_mut().push(("b", *v)));

        dispatcher.emit(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
        assert_eq!(dispatcher.subscriber_count(), 2);
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_drop_releases() {
        let dispatcher: Dispatcher<()> = Dispatcher::new();
        let mut sub = dispatcher.subscribe(|_| {});
        {
            let _scoped = dispatcher.subscribe(|_| {});
            assert_eq!(dispatcher.subscriber_count(), 2);
        }
        assert_eq!(dispatcher.subscriber_count(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_from_inside_callback() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let calls = Rc::new(Cell::new(0));
        let own: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let c = calls.clone();
        let me = own.clone();
        let sub = dispatcher.subscribe(move |_| {
            c.set(c.get() + 1);
            if let Some(mut s) = me.borrow_mut().take() {
                s.unsubscribe();
            }
        });
        *own.borrow_mut() = Some(sub);

        dispatcher.emit(&1);
        dispatcher.emit(&2);
        assert_eq!(calls.get(), 1);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_during_emit_waits_for_next_event() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let late_calls = Rc::new(Cell::new(0));
        let keep: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let d = dispatcher.clone();
        let lc = late_calls.clone();
        let k = keep.clone();
        let _first = dispatcher.subscribe(move |_| {
            if k.borrow().is_empty() {
                let lc = lc.clone();
                k.borrow_mut().push(d.subscribe(move |_| lc.set(lc.get() + 1)));
            }
        });

        dispatcher.emit(&1);
        assert_eq!(late_calls.get(), 0);
        dispatcher.emit(&2);
        assert_eq!(late_calls.get(), 1);
    }
}
