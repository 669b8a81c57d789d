// ============================================================================
// spark-store - History Wrapper
// Bounded undo/redo over full-record snapshots
// ============================================================================
//
// past:   snapshots before each external write, oldest first, at most
//         `max_size` entries (the oldest is evicted on overflow)
// future: snapshots undone, most recent last
//
// undo/redo perform a replace-write through the same `write` path as
// everyone else. A one-shot suppression flag tells that path not to record
// the write and not to clear `future`; it is consumed by exactly one write.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::core::record::{Record, Update};
use crate::core::types::{Listener, Readable, Unsubscribe, Writable};

/// Options for the history wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Maximum number of undo steps kept. Zero disables recording.
    pub max_size: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self { max_size: 100 }
    }
}

struct HistoryInner<W> {
    store: W,
    max_size: usize,
    past: RefCell<VecDeque<Record>>,
    future: RefCell<Vec<Record>>,
    /// Set by undo/redo, consumed by the next write
    suppress: Cell<bool>,
}

/// A store wrapper with bounded undo/redo.
///
/// # Example
///
/// ```
/// use spark_store::{history, record, store, HistoryOptions, Readable, Writable};
///
/// let cell = history(store(record! { "n" => 0 }), HistoryOptions { max_size: 10 });
/// cell.set(record! { "n" => 1 });
/// cell.set(record! { "n" => 2 });
///
/// cell.undo();
/// assert_eq!(cell.get(), record! { "n" => 1 });
/// cell.redo();
/// assert_eq!(cell.get(), record! { "n" => 2 });
/// ```
pub struct History<W> {
    inner: Rc<HistoryInner<W>>,
}

impl<W> Clone for History<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<W: Writable> History<W> {
    pub fn new(store: W, options: HistoryOptions) -> Self {
        Self {
            inner: Rc::new(HistoryInner {
                store,
                max_size: options.max_size,
                past: RefCell::new(VecDeque::new()),
                future: RefCell::new(Vec::new()),
                suppress: Cell::new(false),
            }),
        }
    }

    /// Step back one write. No-op if there is nothing to undo.
    pub fn undo(&self) {
        let Some(previous) = self.inner.past.borrow_mut().pop_back() else {
            return;
        };
        self.inner.future.borrow_mut().push(self.inner.store.get());
        debug!(past = self.past_len(), future = self.future_len(), "undo");

        self.inner.suppress.set(true);
        self.write(Update::Replace(previous));
    }

    /// Re-apply the last undone write. No-op if there is nothing to redo.
    pub fn redo(&self) {
        let Some(next) = self.inner.future.borrow_mut().pop() else {
            return;
        };
        self.push_past(self.inner.store.get());
        debug!(past = self.past_len(), future = self.future_len(), "redo");

        self.inner.suppress.set(true);
        self.write(Update::Replace(next));
    }

    pub fn can_undo(&self) -> bool {
        !self.inner.past.borrow().is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.inner.future.borrow().is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.inner.past.borrow().len()
    }

    pub fn future_len(&self) -> usize {
        self.inner.future.borrow().len()
    }

    /// Forget every undo and redo step. The current record is kept.
    pub fn clear_history(&self) {
        self.inner.past.borrow_mut().clear();
        self.inner.future.borrow_mut().clear();
    }

    /// The wrapped store.
    pub fn inner(&self) -> &W {
        &self.inner.store
    }

    fn push_past(&self, snapshot: Record) {
        if self.inner.max_size == 0 {
            return;
        }
        let mut past = self.inner.past.borrow_mut();
        past.push_back(snapshot);
        while past.len() > self.inner.max_size {
            past.pop_front();
        }
    }
}

impl<W: Writable> Readable for History<W> {
    type Value = Record;

    fn get(&self) -> Record {
        self.inner.store.get()
    }

    fn subscribe_listener(&self, listener: Listener<Record>) -> Unsubscribe {
        self.inner.store.subscribe_listener(listener)
    }
}

impl<W: Writable> Writable for History<W> {
    fn write(&self, update: Update) {
        if !self.inner.suppress.replace(false) {
            self.push_past(self.inner.store.get());
            self.inner.future.borrow_mut().clear();
        }
        self.inner.store.write(update);
    }
}

/// Wrap a store with undo/redo.
pub fn history<W: Writable>(store: W, options: HistoryOptions) -> History<W> {
    History::new(store, options)
}

// =============================================================================
// TESTS
// =============================================================================
