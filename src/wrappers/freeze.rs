// ============================================================================
// spark-store - Freeze Wrapper
// Make every committed record immutable
// ============================================================================
//
// Pass-through: `with_freeze` hands back the very store it was given, after
// attaching a listener that freezes each record as it is committed (the
// catch-up call freezes the current one). Attempts to mutate a frozen record
// in place fail with `StoreError::Frozen`.
//
// Whether freezing is active is decided here, at the boundary, by a policy
// value - the store itself never looks at the build profile.
// ============================================================================

use tracing::debug;

use crate::core::record::Record;
use crate::core::types::Readable;

/// When freezing is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreezePolicy {
    /// Always freeze.
    Always,
    /// Never freeze; `with_freeze` is a plain pass-through.
    Never,
    /// Freeze in builds with debug assertions only.
    #[default]
    DebugOnly,
}

impl FreezePolicy {
    pub fn is_active(self) -> bool {
        match self {
            FreezePolicy::Always => true,
            FreezePolicy::Never => false,
            FreezePolicy::DebugOnly => cfg!(debug_assertions),
        }
    }
}

/// Freeze every record the store commits, according to `policy`.
///
/// Returns `store` itself, so identity-sensitive consumers are unaffected.
///
/// # Example
///
/// ```
/// use spark_store::{record, store, with_freeze, FreezePolicy, Readable, StoreError, Writable};
///
/// let cell = with_freeze(store(record! { "n" => 1 }), FreezePolicy::Always);
/// cell.set(record! { "n" => 2 });
///
/// let mut snapshot = cell.get();
/// assert_eq!(
///     snapshot.insert("n", 3),
///     Err(StoreError::Frozen { key: "n".to_string() })
/// );
/// ```
pub fn with_freeze<R>(store: R, policy: FreezePolicy) -> R
where
    R: Readable<Value = Record>,
{
    if policy.is_active() {
        debug!(?policy, "freezing store records");
        store.subscribe(|state: &Record| state.freeze());
    }
    store
}

// =============================================================================
// TESTS
// =============================================================================
