// ============================================================================
// spark-store - Distinct Wrapper
// Drop writes that would not change the record
// ============================================================================

use tracing::trace;

use crate::core::record::{Record, Update};
use crate::core::types::{EqualsFn, Listener, Readable, Unsubscribe, Writable};
use crate::reactivity::equality::shallow_equals;

/// A store wrapper that forwards a write only if it changes the record.
///
/// The candidate record is computed from the current value and compared
/// with `equals` (default [`shallow_equals`]); reads and subscriptions go
/// straight to the wrapped store.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_store::{distinct, record, store, Readable, Writable};
///
/// let cell = distinct(store(record! { "n" => 1 }));
/// let calls = Rc::new(Cell::new(0));
/// let calls_clone = calls.clone();
/// cell.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));
///
/// cell.set(record! { "n" => 1 });
/// assert_eq!(calls.get(), 1);
/// cell.set(record! { "n" => 2 });
/// assert_eq!(calls.get(), 2);
/// ```
#[derive(Clone)]
pub struct Distinct<W> {
    store: W,
    equals: EqualsFn<Record>,
}

impl<W: Writable> Distinct<W> {
    pub fn new(store: W, equals: EqualsFn<Record>) -> Self {
        Self { store, equals }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &W {
        &self.store
    }
}

impl<W: Writable> Readable for Distinct<W> {
    type Value = Record;

    fn get(&self) -> Record {
        self.store.get()
    }

    fn subscribe_listener(&self, listener: Listener<Record>) -> Unsubscribe {
        self.store.subscribe_listener(listener)
    }
}

impl<W: Writable> Writable for Distinct<W> {
    fn write(&self, update: Update) {
        let current = self.store.get();
        let change = update.resolve(&current);
        let candidate = change.apply(&current);

        if (self.equals)(&current, &candidate) {
            trace!("distinct store skipped an unchanged write");
            return;
        }
        self.store.write(Update::from(change));
    }
}

/// Wrap a store with shallow distinctness.
pub fn distinct<W: Writable>(store: W) -> Distinct<W> {
    Distinct::new(store, shallow_equals)
}

/// Wrap a store with a custom distinctness predicate.
pub fn distinct_with<W: Writable>(store: W, equals: EqualsFn<Record>) -> Distinct<W> {
    Distinct::new(store, equals)
}

// =============================================================================
// TESTS
// =============================================================================
