// ============================================================================
// spark-store - Persistence Adapter
// Mirror a store into a key-value backend
// ============================================================================
//
// At wrap time the stored JSON (if any) is loaded with one merge-write.
// From then on every committed record - the catch-up one included - is
// serialized and written back under the same key.
//
// Failures never escape: malformed stored data and backend write errors
// become warnings, and a missing backend turns the adapter into a no-op.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::core::error::StorageError;
use crate::core::record::{Record, Update};
use crate::core::types::Writable;

// =============================================================================
// STORAGE BACKENDS
// =============================================================================

/// A string key-value backend.
pub trait KeyValueStorage {
    /// The stored string, or `None` if the key is absent.
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && key != "."
            && key != "..";
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let path = match self.path_for(key) {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "cannot read persisted state");
                return None;
            }
        };
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                let err = StorageError::Io {
                    key: key.to_string(),
                    source,
                };
                warn!(%err, "cannot read persisted state; treating as absent");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        fs::write(path, value).map_err(io_err)
    }
}

// =============================================================================
// ADAPTER
// =============================================================================

/// Options for [`with_persistence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOptions {
    /// Storage key the record lives under.
    pub key: String,
}

impl PersistOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Keep `store` in sync with `storage` under `options.key`.
///
/// Pass-through: returns `store` itself. With `storage == None` (no backend
/// in this environment) nothing happens at all.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use spark_store::{
///     record, store, with_persistence, KeyValueStorage, MemoryStorage, PersistOptions, Readable,
///     Writable,
/// };
///
/// let backend = MemoryStorage::new();
/// backend.set_item("prefs", r#"{"theme":"dark"}"#).unwrap();
///
/// let prefs = with_persistence(
///     store(record! { "theme" => "light", "size" => 12 }),
///     PersistOptions::new("prefs"),
///     Some(Rc::new(backend.clone())),
/// );
/// assert_eq!(prefs.get(), record! { "theme" => "dark", "size" => 12 });
///
/// prefs.set(record! { "size" => 14 });
/// assert_eq!(
///     backend.get_item("prefs").as_deref(),
///     Some(r#"{"theme":"dark","size":14}"#)
/// );
/// ```
pub fn with_persistence<W>(
    store: W,
    options: PersistOptions,
    storage: Option<Rc<dyn KeyValueStorage>>,
) -> W
where
    W: Writable,
{
    let Some(storage) = storage else {
        debug!(key = %options.key, "no storage backend; persistence disabled");
        return store;
    };
    let key = options.key;

    if let Some(text) = storage.get_item(&key) {
        match Record::from_json(&text) {
            Ok(saved) => {
                debug!(%key, fields = saved.len(), "restoring persisted state");
                store.write(Update::Patch(saved));
            }
            Err(err) => {
                warn!(%key, %err, "ignoring malformed persisted state");
            }
        }
    }

    store.subscribe(move |state: &Record| {
        let text = match state.to_json() {
            Ok(text) => text,
            Err(err) => {
                warn!(%key, %err, "cannot serialize state");
                return;
            }
        };
        if let Err(err) = storage.set_item(&key, &text) {
            warn!(%key, %err, "cannot persist state");
        }
    });
    store
}

// =============================================================================
// TESTS
// =============================================================================
