// ============================================================================
// spark-store - Type Definitions
// The store contract shared by cells, derived nodes and wrappers
// ============================================================================
//
// Everything that can be observed implements `Readable`; everything that can
// also be written with record updates implements `Writable`. Wrappers and
// derived nodes are generic over these traits, so any object with the
// get/subscribe(/write) shape is substitutable - including derived-of-derived
// graphs and stacks of wrappers.
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::record::{Record, Update};

// =============================================================================
// LISTENERS & UNSUBSCRIBE
// =============================================================================

/// A subscriber callback.
///
/// Subscriptions are keyed by registration, not by closure, so registering
/// the same `Rc` twice yields two independent subscriptions.
pub type Listener<T> = Rc<dyn Fn(&T)>;

/// Handle returned by `subscribe`.
///
/// Calling it detaches the listener. It is idempotent: the second and later
/// calls do nothing. Dropping the handle does NOT unsubscribe.
#[derive(Clone)]
pub struct Unsubscribe {
    teardown: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl Unsubscribe {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Rc::new(RefCell::new(Some(Box::new(teardown)))),
        }
    }

    /// An already-spent handle.
    pub fn noop() -> Self {
        Self {
            teardown: Rc::new(RefCell::new(None)),
        }
    }

    /// Detach the listener. No-op after the first call.
    pub fn call(&self) {
        // Take before running so a re-entrant call sees the handle as spent
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Whether `call` still has something to do.
    pub fn is_active(&self) -> bool {
        self.teardown.borrow().is_some()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// EQUALITY
// =============================================================================

/// Equality function used to gate notifications.
///
/// Returns true if the two values are considered equal (no notification).
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq.
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// STORE CONTRACT
// =============================================================================

/// The read side of the store contract.
///
/// # Contract
///
/// - `get` returns the current value without side effects.
/// - `subscribe` registers a listener and invokes it once with the current
///   value before returning (the catch-up call), then on every change.
/// - the returned [`Unsubscribe`] is idempotent.
pub trait Readable {
    type Value: Clone + 'static;

    /// Current value.
    fn get(&self) -> Self::Value;

    /// Register a boxed listener.
    fn subscribe_listener(&self, listener: Listener<Self::Value>) -> Unsubscribe;

    /// Register a listener closure.
    fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Self::Value) + 'static,
        Self: Sized,
    {
        self.subscribe_listener(Rc::new(listener))
    }
}

/// The write side of the store contract.
///
/// Only record-valued stores are writable; derived nodes are read-only.
pub trait Writable: Readable<Value = Record> {
    /// Resolve `update` against the current record, shallow-merge (or
    /// replace) and notify.
    fn write(&self, update: Update);

    /// Write a patch or any other `Update`.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_store::{record, store, Readable, Update, Writable};
    ///
    /// let cell = store(record! { "count" => 0 });
    /// cell.set(record! { "count" => 1 });
    /// cell.set(Update::with(|s| {
    ///     let n = s.get_as::<i64>("count").unwrap_or(0);
    ///     record! { "count" => n + 1 }
    /// }));
    /// assert_eq!(cell.get(), record! { "count" => 2 });
    /// ```
    fn set<U>(&self, update: U)
    where
        U: Into<Update>,
        Self: Sized,
    {
        self.write(update.into())
    }

    /// Functional update: compute a patch from the current record.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&Record) -> Record + 'static,
        Self: Sized,
    {
        self.write(Update::with(f))
    }

    /// Fallible functional update.
    ///
    /// If `f` fails nothing is merged and nobody is notified; the error is
    /// returned as-is.
    fn try_update<F, E>(&self, f: F) -> Result<(), E>
    where
        F: FnOnce(&Record) -> Result<Record, E>,
        Self: Sized,
    {
        let patch = f(&self.get())?;
        self.write(Update::Patch(patch));
        Ok(())
    }

    /// Replace the whole record instead of merging.
    fn replace(&self, next: Record) {
        self.write(Update::Replace(next))
    }
}

impl<R: Readable + ?Sized> Readable for Rc<R> {
    type Value = R::Value;

    fn get(&self) -> Self::Value {
        (**self).get()
    }

    fn subscribe_listener(&self, listener: Listener<Self::Value>) -> Unsubscribe {
        (**self).subscribe_listener(listener)
    }
}

impl<W: Writable + ?Sized> Writable for Rc<W> {
    fn write(&self, update: Update) {
        (**self).write(update)
    }
}

// =============================================================================
// TESTS
// =============================================================================
