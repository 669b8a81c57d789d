// ============================================================================
// spark-store - Reset Wrapper
// Restore the record captured at wrap time
// ============================================================================

use tracing::debug;

use crate::core::record::{Record, Update};
use crate::core::types::{Listener, Readable, Unsubscribe, Writable};

/// A store wrapper with a `reset()` back to its initial record.
///
/// The snapshot is taken when the wrapper is built. `reset()` is a full
/// replace (keys added since then disappear) and notifies like any write.
///
/// # Example
///
/// ```
/// use spark_store::{record, resettable, store, Readable, Writable};
///
/// let cell = resettable(store(record! { "count" => 0 }));
/// cell.set(record! { "count" => 5, "extra" => true });
/// cell.reset();
/// assert_eq!(cell.get(), record! { "count" => 0 });
/// ```
#[derive(Clone)]
pub struct Resettable<W> {
    store: W,
    initial: Record,
}

impl<W: Writable> Resettable<W> {
    pub fn new(store: W) -> Self {
        let initial = store.get();
        Self { store, initial }
    }

    /// Replace the current record with the initial snapshot.
    pub fn reset(&self) {
        debug!("resetting store to its initial record");
        self.store.write(Update::Replace(self.initial.clone()));
    }

    /// The snapshot `reset()` restores.
    pub fn initial(&self) -> &Record {
        &self.initial
    }

    /// The wrapped store.
    pub fn inner(&self) -> &W {
        &self.store
    }
}

impl<W: Writable> Readable for Resettable<W> {
    type Value = Record;

    fn get(&self) -> Record {
        self.store.get()
    }

    fn subscribe_listener(&self, listener: Listener<Record>) -> Unsubscribe {
        self.store.subscribe_listener(listener)
    }
}

impl<W: Writable> Writable for Resettable<W> {
    fn write(&self, update: Update) {
        self.store.write(update)
    }
}

/// Wrap a store with `reset()`.
pub fn resettable<W: Writable>(store: W) -> Resettable<W> {
    Resettable::new(store)
}

// =============================================================================
// TESTS
// =============================================================================
