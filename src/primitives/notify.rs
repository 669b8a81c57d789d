// ============================================================================
// spark-store - Notification Bus
// Per-cell ordered listener collection
// ============================================================================
//
// Every store and derived node owns exactly one bus. There is no global
// registry: a bus only knows its own listeners.
//
// Notification iterates over a snapshot taken at the start of the pass, so a
// listener may unsubscribe itself or others mid-pass without anyone being
// skipped or called twice. A listener removed mid-pass still receives the
// call that was already part of the snapshot.
//
// Passes nest (a listener may write to another store). Derived nodes use
// `after_pass` so their own notification waits until the outermost pass has
// finished: by then every source has completed its pass for the write.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::core::context::{with_context, Task};
use crate::core::types::{Listener, Unsubscribe};

/// Ordered set of listeners for values of type `T`.
pub struct Subscribers<T> {
    entries: RefCell<Vec<(u64, Listener<T>)>>,
    next_id: Cell<u64>,
}

impl<T> Subscribers<T> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        })
    }

    /// Register a listener and return its id.
    pub fn add(&self, listener: Listener<T>) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    /// Remove a listener by id. Returns false if it was already gone.
    pub fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn clear(&self) {
        // Drop the listeners outside the borrow; their captures may own
        // handles that touch this bus on drop.
        let drained = std::mem::take(&mut *self.entries.borrow_mut());
        drop(drained);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<T: 'static> Subscribers<T> {
    /// Invoke every listener with `value`, in subscription order.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        trace!(listeners = snapshot.len(), "notification pass");
        {
            let _pass = PassGuard::enter();
            for listener in snapshot {
                listener(value);
            }
        }
        drain_post_pass();
    }

    /// Register `listener`, give it the catch-up call with `current`, and
    /// return a handle that removes it.
    pub fn subscribe(self: &Rc<Self>, listener: Listener<T>, current: &T) -> Unsubscribe {
        let id = self.add(Rc::clone(&listener));
        let bus: Weak<Self> = Rc::downgrade(self);

        listener(current);

        Unsubscribe::new(move || {
            if let Some(bus) = bus.upgrade() {
                bus.remove(id);
            }
        })
    }
}

// =============================================================================
// PASS TRACKING
// =============================================================================

struct PassGuard;

impl PassGuard {
    fn enter() -> Self {
        with_context(|ctx| ctx.enter_pass());
        PassGuard
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        let depth = with_context(|ctx| ctx.exit_pass());
        // A listener panicked: the write is abandoned, so are its follow-ups
        if depth == 0 && std::thread::panicking() {
            discard_post_pass();
        }
    }
}

/// Run `task` once no notification pass is running.
///
/// Outside a pass it runs immediately.
pub fn after_pass(task: impl FnOnce() + 'static) {
    let in_pass = with_context(|ctx| ctx.in_pass());
    if in_pass {
        with_context(|ctx| ctx.push_post_pass(Box::new(task) as Task));
    } else {
        task();
    }
}

fn drain_post_pass() {
    let can_drain = with_context(|ctx| !ctx.in_pass() && !ctx.set_draining_post_pass(true));
    if !can_drain {
        return;
    }

    // Use a guard pattern so a panicking listener doesn't wedge the queue
    struct DrainGuard;

    impl Drop for DrainGuard {
        fn drop(&mut self) {
            if std::thread::panicking() {
                discard_post_pass();
            }
            with_context(|ctx| ctx.set_draining_post_pass(false));
        }
    }

    let _guard = DrainGuard;
    while let Some(task) = with_context(|ctx| ctx.pop_post_pass()) {
        task();
    }
}

/// Drop every queued post-pass task without running it.
fn discard_post_pass() {
    let dropped = with_context(|ctx| ctx.take_post_pass());
    if !dropped.is_empty() {
        trace!(dropped = dropped.len(), "discarding post-pass notifications");
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, name: &'static str) -> Listener<i32> {
        let log = log.clone();
        Rc::new(move |v: &i32| log.borrow_mut().push(format!("{name}:{v}")))
    }

    #[test]
    fn notifies_in_subscription_order() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.add(recorder(&log, "a"));
        bus.add(recorder(&log, "b"));
        bus.add(recorder(&log, "c"));

        bus.notify(&1);
        assert_eq!(*log.borrow(), vec!["a:1", "b:1", "c:1"]);
    }

    #[test]
    fn same_listener_twice_is_two_subscriptions() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let listener = recorder(&log, "x");

        let first = bus.add(listener.clone());
        bus.add(listener);
        assert_eq!(bus.len(), 2);

        bus.remove(first);
        bus.notify(&7);
        assert_eq!(*log.borrow(), vec!["x:7"]);
    }

    #[test]
    fn subscribe_gives_catch_up_call() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let unsub = bus.subscribe(recorder(&log, "a"), &5);

        assert_eq!(*log.borrow(), vec!["a:5"]);
        unsub.call();
        unsub.call();
        assert!(bus.is_empty());
    }

    #[test]
    fn unsubscribing_another_mid_pass_does_not_skip() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let victim_clone = victim.clone();
        let log_clone = log.clone();
        let _killer = bus.subscribe(
            Rc::new(move |v: &i32| {
                log_clone.borrow_mut().push(format!("killer:{v}"));
                if let Some(unsub) = victim_clone.borrow().as_ref() {
                    unsub.call();
                }
            }),
            &0,
        );
        *victim.borrow_mut() = Some(bus.subscribe(recorder(&log, "victim"), &0));
        let _tail = bus.subscribe(recorder(&log, "tail"), &0);
        log.borrow_mut().clear();

        bus.notify(&1);
        // victim was in the snapshot, tail was not skipped
        assert_eq!(*log.borrow(), vec!["killer:1", "victim:1", "tail:1"]);

        log.borrow_mut().clear();
        bus.notify(&2);
        assert_eq!(*log.borrow(), vec!["killer:2", "tail:2"]);
    }

    #[test]
    fn self_unsubscribe_mid_pass() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let own: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let own_clone = own.clone();
        let log_clone = log.clone();
        let handle = bus.subscribe(
            Rc::new(move |v: &i32| {
                log_clone.borrow_mut().push(format!("once:{v}"));
                if let Some(unsub) = own_clone.borrow().as_ref() {
                    unsub.call();
                }
            }),
            &0,
        );
        *own.borrow_mut() = Some(handle);
        let _other = bus.subscribe(recorder(&log, "other"), &0);
        log.borrow_mut().clear();

        bus.notify(&1);
        bus.notify(&2);
        assert_eq!(*log.borrow(), vec!["once:1", "other:1", "other:2"]);
    }

    #[test]
    fn after_pass_waits_for_outermost_pass() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_clone = log.clone();
        bus.add(Rc::new(move |_: &i32| {
            let log_inner = log_clone.clone();
            after_pass(move || log_inner.borrow_mut().push("deferred".to_string()));
            log_clone.borrow_mut().push("first".to_string());
        }));
        bus.add(recorder(&log, "second"));

        bus.notify(&1);
        assert_eq!(*log.borrow(), vec!["first", "second:1", "deferred"]);
    }

    #[test]
    fn panicking_listener_discards_post_pass_work() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let ran = Rc::new(Cell::new(false));

        let ran_clone = ran.clone();
        bus.add(Rc::new(move |_: &i32| {
            let ran_inner = ran_clone.clone();
            after_pass(move || ran_inner.set(true));
        }));
        bus.add(Rc::new(|v: &i32| {
            if *v > 0 {
                panic!("listener failure");
            }
        }));

        let bus_clone = bus.clone();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            bus_clone.notify(&1);
        }));

        assert!(outcome.is_err());
        assert!(!ran.get());
        assert!(!with_context(|ctx| ctx.in_pass()));
        assert!(with_context(|ctx| ctx.take_post_pass()).is_empty());
    }

    #[test]
    fn after_pass_outside_pass_runs_now() {
        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        after_pass(move || ran_clone.set(true));
        assert!(ran.get());
    }

    #[test]
    fn unsubscribe_after_bus_dropped_is_noop() {
        let bus: Rc<Subscribers<i32>> = Subscribers::new();
        let unsub = bus.subscribe(Rc::new(|_: &i32| {}), &0);
        drop(bus);
        unsub.call();
    }
}
