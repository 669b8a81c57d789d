// ============================================================================
// spark-store - Logging Wrapper
// Emit every committed record as a tracing event
// ============================================================================

use tracing::info;

use crate::core::record::Record;
use crate::core::types::Readable;

/// Log every state the store commits, including the current one.
///
/// Pass-through: returns `store` itself. Events are emitted at `INFO` with
/// the `store` label and the record as compact JSON; formatting is up to the installed
/// tracing subscriber.
pub fn with_logging<R>(store: R, label: &str) -> R
where
    R: Readable<Value = Record>,
{
    let label = label.to_string();
    store.subscribe(move |state: &Record| {
        info!(store = %label, %state, "state");
    });
    store
}

// =============================================================================
// TESTS
// =============================================================================
