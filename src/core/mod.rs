// ============================================================================
// spark-store - Core Module
// Records, the store contract, errors and the reactive context
// ============================================================================

pub mod context;
pub mod error;
pub mod record;
pub mod types;

// Re-export commonly used items
pub use context::{is_flushing, pending_tasks, with_context, ReactiveContext, Task};
pub use error::{Result, StorageError, StoreError};
pub use record::{Change, Record, Update, UpdateFn};
pub use types::{default_equals, EqualsFn, Listener, Readable, Unsubscribe, Writable};
