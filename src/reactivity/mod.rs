// ============================================================================
// spark-store - Reactivity Module
// Deferred scheduling, batching and equality predicates
// ============================================================================

pub mod batching;
pub mod equality;
pub mod scheduling;

// Re-export scheduling functions
pub use scheduling::{has_pending, schedule, tick, turn, MAX_FLUSH_COUNT};

// Re-export batching
pub use batching::{batched, Batched};
