// ============================================================================
// spark-store - Batching
// Coalesce writes into one deferred flush per turn
// ============================================================================
//
// A batched store queues every write and schedules a single flush on the
// deferred queue (see `scheduling`). The flush performs exactly one write on
// the wrapped store with the accumulated change, so subscribers see one
// notification per turn no matter how many writes happened.
//
// Reads are optimistic: `get()` shows the queued change merged over the
// committed value. `committed()` shows what subscribers have been told.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::core::record::{Change, Record, Update};
use crate::core::types::{Listener, Readable, Unsubscribe, Writable};
use crate::reactivity::scheduling::schedule;

// =============================================================================
// BATCHED INNER
// =============================================================================

struct BatchedInner<W> {
    store: W,

    /// Accumulated change since the last flush
    queued: RefCell<Option<Change>>,

    /// A flush is waiting on the deferred queue
    scheduled: Cell<bool>,

    /// Bumped by every flush so a stale scheduled task can tell it's stale
    epoch: Cell<u64>,
}

impl<W: Writable> BatchedInner<W> {
    fn flush(&self) {
        self.scheduled.set(false);
        self.epoch.set(self.epoch.get() + 1);

        let queued = self.queued.borrow_mut().take();
        if let Some(change) = queued {
            debug!("flushing batched store");
            self.store.write(Update::from(change));
        }
    }
}

// =============================================================================
// BATCHED<W> - The public wrapper
// =============================================================================

/// A store wrapper that defers and coalesces writes.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_store::{batched, record, store, tick, Readable, Writable};
///
/// let cell = batched(store(record! { "a" => 0, "b" => 0 }));
/// let calls = Rc::new(Cell::new(0));
/// let calls_clone = calls.clone();
/// cell.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));
///
/// cell.set(record! { "a" => 1 });
/// cell.set(record! { "b" => 2 });
/// // Optimistic read
/// assert_eq!(cell.get(), record! { "a" => 1, "b" => 2 });
/// assert_eq!(calls.get(), 1);
///
/// tick().unwrap();
/// assert_eq!(calls.get(), 2);
/// ```
pub struct Batched<W> {
    inner: Rc<BatchedInner<W>>,
}

impl<W> Clone for Batched<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<W: Writable + 'static> Batched<W> {
    pub fn new(store: W) -> Self {
        Self {
            inner: Rc::new(BatchedInner {
                store,
                queued: RefCell::new(None),
                scheduled: Cell::new(false),
                epoch: Cell::new(0),
            }),
        }
    }

    /// Flush now instead of waiting for the checkpoint.
    pub fn flush(&self) {
        self.inner.flush();
    }

    /// Whether a flush is waiting on the deferred queue.
    pub fn is_scheduled(&self) -> bool {
        self.inner.scheduled.get()
    }

    /// The value subscribers have been notified of.
    pub fn committed(&self) -> Record {
        self.inner.store.get()
    }

    /// The wrapped store.
    pub fn inner(&self) -> &W {
        &self.inner.store
    }
}

impl<W: Writable + 'static> Readable for Batched<W> {
    type Value = Record;

    /// The committed value with any queued change applied.
    ///
    /// While a change is queued every call builds a new record.
    fn get(&self) -> Record {
        let committed = self.inner.store.get();
        match self.inner.queued.borrow().as_ref() {
            Some(change) => change.apply(&committed),
            None => committed,
        }
    }

    /// The catch-up call gets the same optimistic value `get()` returns;
    /// later calls get each committed value at flush time.
    fn subscribe_listener(&self, listener: Listener<Record>) -> Unsubscribe {
        if self.inner.queued.borrow().is_none() {
            return self.inner.store.subscribe_listener(listener);
        }

        let catch_up = Cell::new(Some(self.get()));
        self.inner
            .store
            .subscribe_listener(Rc::new(move |committed: &Record| match catch_up.take() {
                Some(optimistic) => listener(&optimistic),
                None => listener(committed),
            }))
    }
}

impl<W: Writable + 'static> Writable for Batched<W> {
    fn write(&self, update: Update) {
        // Functional updates see the optimistic value
        let effective = self.get();
        let change = update.resolve(&effective);

        {
            let mut queued = self.inner.queued.borrow_mut();
            let next = match queued.take() {
                Some(previous) => previous.then(change),
                None => change,
            };
            *queued = Some(next);
        }

        if self.inner.scheduled.replace(true) {
            return;
        }
        let inner = Rc::clone(&self.inner);
        let epoch = inner.epoch.get();
        schedule(move || {
            if inner.epoch.get() == epoch {
                inner.flush();
            }
        });
    }
}

impl<W: Writable + 'static> fmt::Debug for Batched<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batched")
            .field("committed", &self.committed())
            .field("queued", &*self.inner.queued.borrow())
            .finish()
    }
}

/// Wrap a store so writes are coalesced until the next checkpoint.
pub fn batched<W: Writable + 'static>(store: W) -> Batched<W> {
    Batched::new(store)
}

// =============================================================================
// TESTS
// =============================================================================
