// ============================================================================
// spark-store - Errors
// Error types surfaced by stores, wrappers and storage backends
// ============================================================================

use thiserror::Error;

/// Errors raised by the store core and its wrappers.
///
/// User-supplied compute functions and updaters are never wrapped in this
/// type: a panic unwinds straight to the caller, and the error of a fallible
/// updater is handed back untouched by `Writable::try_update`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A frozen record was mutated in place.
    #[error("cannot mutate field `{key}` of a frozen record")]
    Frozen { key: String },

    /// The deferred task queue kept re-scheduling itself.
    #[error("deferred flush exceeded {limit} tasks; aborting (possible infinite update loop)")]
    FlushLimit { limit: u32 },

    /// A record could not be parsed from or written to JSON.
    #[error("invalid record data: {0}")]
    InvalidRecord(String),
}

/// Errors reported by a `KeyValueStorage` backend.
///
/// These never escape a persisted store; the persistence adapter downgrades
/// them to warnings.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for key `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
