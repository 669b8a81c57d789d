// ============================================================================
// spark-store - Wrappers Module
// Decorators that keep (or extend) the store contract
// ============================================================================
//
// Two kinds:
// - pass-through (freeze, logging, persistence): return the store they were
//   given, so store identity is preserved
// - intercepting (distinct, reset, history): return a new object that
//   delegates reads and subscriptions and intercepts writes
// ============================================================================

pub mod distinct;
pub mod freeze;
pub mod history;
pub mod logging;
pub mod persist;
pub mod reset;

pub use distinct::{distinct, distinct_with, Distinct};
pub use freeze::{with_freeze, FreezePolicy};
pub use history::{history, History, HistoryOptions};
pub use logging::with_logging;
pub use persist::{
    with_persistence, FileStorage, KeyValueStorage, MemoryStorage, PersistOptions,
};
pub use reset::{resettable, Resettable};
