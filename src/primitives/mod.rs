// ============================================================================
// spark-store - Primitives Module
// Core primitives: the store, derived nodes and the notification bus
// ============================================================================

pub mod derived;
pub mod notify;
pub mod store;

// Re-export for convenience
pub use derived::{
    derived, derived_batched, derived_with_equals, derived_with_options, select, Derived,
    DerivedOptions, NodeStatus, Sources,
};
pub use notify::{after_pass, Subscribers};
pub use store::{store, Store};
