// ============================================================================
// spark-store - A Minimal Observable Store for Rust
// ============================================================================
//
// Mutable record stores with get/set/subscribe, derived read-only nodes
// computed from one or more sources, and composable wrappers (batching,
// distinctness, freeze, reset, logging, undo/redo, persistence).
// ============================================================================

#[macro_use]
mod macros;

pub mod core;
pub mod primitives;
pub mod reactivity;
pub mod wrappers;

// Used by the `record!` macro
pub use serde_json;
pub use serde_json::Value;

// Re-export core items at crate root for ergonomic access
pub use crate::core::context::{is_flushing, pending_tasks, with_context, ReactiveContext};
pub use crate::core::error::{Result, StorageError, StoreError};
pub use crate::core::record::{Change, Record, Update};
pub use crate::core::types::{default_equals, EqualsFn, Listener, Readable, Unsubscribe, Writable};

// Re-export primitives at crate root
pub use primitives::derived::{
    derived, derived_batched, derived_with_equals, derived_with_options, select, Derived,
    DerivedOptions, NodeStatus, Sources,
};
pub use primitives::store::{store, Store};

// Re-export reactivity functions
pub use reactivity::batching::{batched, Batched};
pub use reactivity::equality::{always_equals, equals, never_equals, shallow_equals};
pub use reactivity::scheduling::{has_pending, schedule, tick, turn};

// Re-export wrappers
pub use wrappers::{
    distinct, distinct_with, history, resettable, with_freeze, with_logging, with_persistence,
    Distinct, FileStorage, FreezePolicy, History, HistoryOptions, KeyValueStorage, MemoryStorage,
    PersistOptions, Resettable,
};

// =============================================================================
// TESTS
// =============================================================================
