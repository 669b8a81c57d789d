// ============================================================================
// spark-store - Store Primitive
// The mutable cell: a record with shallow-merge writes and notification
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::core::record::{Record, Update};
use crate::core::types::{Listener, Readable, Unsubscribe, Writable};
use crate::primitives::notify::Subscribers;

// =============================================================================
// STORE INNER
// =============================================================================

struct StoreInner {
    state: RefCell<Record>,
    subscribers: Rc<Subscribers<Record>>,
}

// =============================================================================
// STORE - The public cell handle
// =============================================================================

/// A mutable, observable record.
///
/// Every write shallow-merges the update over the current record, installs
/// the result as a new record and synchronously notifies every subscriber
/// in subscription order. Clones share the same cell.
///
/// There is no destroy: a store goes away when the last handle (including
/// handles captured by wrappers or derived nodes) is dropped.
///
/// # Example
///
/// ```
/// use spark_store::{record, store, Readable, Writable};
///
/// let cell = store(record! { "count" => 0 });
/// cell.set(record! { "count" => 1 });
/// cell.update(|s| record! { "count" => s.get_as::<i64>("count").unwrap_or(0) + 1 });
/// assert_eq!(cell.get(), record! { "count" => 2 });
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Create a store holding `initial`.
    ///
    /// `get()` returns `initial` itself (same identity) until the first write.
    pub fn new(initial: Record) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(initial),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Whether two handles refer to the same cell.
    pub fn ptr_eq(a: &Store, b: &Store) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl Readable for Store {
    type Value = Record;

    fn get(&self) -> Record {
        self.inner.state.borrow().clone()
    }

    fn subscribe_listener(&self, listener: Listener<Record>) -> Unsubscribe {
        let current = self.get();
        self.inner.subscribers.subscribe(listener, &current)
    }
}

impl Writable for Store {
    fn write(&self, update: Update) {
        let current = self.get();
        // Resolve before touching state: a panicking updater leaves it as is
        let next = update.resolve(&current).apply(&current);

        *self.inner.state.borrow_mut() = next.clone();
        trace!(fields = next.len(), "store write");

        // Notify outside the borrow: listeners may write again
        self.inner.subscribers.notify(&next);
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// =============================================================================
// STORE CREATION FUNCTIONS
// =============================================================================

/// Create a new store.
///
/// # Example
///
/// ```
/// use spark_store::{record, store, Readable};
///
/// let initial = record! { "count" => 0 };
/// let cell = store(initial.clone());
/// assert!(spark_store::Record::ptr_eq(&cell.get(), &initial));
/// ```
pub fn store(initial: Record) -> Store {
    Store::new(initial)
}

// =============================================================================
// TESTS
// =============================================================================
