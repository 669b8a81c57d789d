// ============================================================================
// spark-store - Records
// The state value held by a store, plus the update/change vocabulary
// ============================================================================
//
// A Record is an insertion-ordered map of named fields. Both the map and
// every field value sit behind an Rc:
// - cloning a Record (what `get()` hands out) is O(1) and shares identity
// - a shallow merge keeps the Rc of every untouched field, so per-field
//   identity comparison can tell "same value object" from "equal value"
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::error::{Result, StoreError};

// =============================================================================
// RECORD
// =============================================================================

#[derive(Clone)]
struct RecordInner {
    fields: IndexMap<String, Rc<Value>>,
    frozen: Cell<bool>,
}

/// A record of named fields - the state held by a [`Store`](crate::Store).
///
/// Records are cheap handles. A store replaces its record on every write, so
/// [`Record::ptr_eq`] tells whether two reads saw the same write.
///
/// # Example
///
/// ```
/// use spark_store::record;
///
/// let a = record! { "count" => 1, "name" => "spark" };
/// let b = a.merge(&record! { "count" => 2 });
///
/// assert_eq!(b.get_as::<i64>("count"), Some(2));
/// assert_eq!(b.get_as::<String>("name").as_deref(), Some("spark"));
/// assert_eq!(a.get_as::<i64>("count"), Some(1));
/// ```
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::from_fields(IndexMap::new())
    }

    fn from_fields(fields: IndexMap<String, Rc<Value>>) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                fields,
                frozen: Cell::new(false),
            }),
        }
    }

    /// Read a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.fields.get(key).map(|v| v.as_ref())
    }

    /// Read a field and deserialize it into `T`.
    ///
    /// Returns `None` if the field is missing or has the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub(crate) fn fields(&self) -> &IndexMap<String, Rc<Value>> {
        &self.inner.fields
    }

    /// Shallow merge: top-level keys of `patch` overwrite those of `self`.
    ///
    /// Nested values are replaced wholesale, never merged. The result is a
    /// new, unfrozen record even when `patch` is empty.
    pub fn merge(&self, patch: &Record) -> Record {
        let mut fields = self.inner.fields.clone();
        for (key, value) in patch.inner.fields.iter() {
            fields.insert(key.clone(), Rc::clone(value));
        }
        Self::from_fields(fields)
    }

    /// Copy the fields into a record with a new identity.
    pub fn fresh_copy(&self) -> Record {
        Self::from_fields(self.inner.fields.clone())
    }

    /// Whether two handles point at the same record.
    pub fn ptr_eq(a: &Record, b: &Record) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    // =========================================================================
    // FREEZING
    // =========================================================================

    /// Mark the record (and every handle sharing it) immutable.
    ///
    /// Nested values are only reachable mutably through [`Record::get_mut`],
    /// so freezing the record freezes everything under it.
    pub fn freeze(&self) {
        self.inner.frozen.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.get()
    }

    fn ensure_mutable(&self, key: &str) -> Result<()> {
        if self.is_frozen() {
            return Err(StoreError::Frozen {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Insert a field in place.
    ///
    /// Copy-on-write: if the record is shared (for example with the store it
    /// was read from) this handle detaches first, so a store's state can
    /// only change through `write`. Fails on a frozen record.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into();
        self.ensure_mutable(&key)?;
        let inner = Rc::make_mut(&mut self.inner);
        Ok(inner
            .fields
            .insert(key, Rc::new(value.into()))
            .map(Rc::unwrap_or_clone))
    }

    /// Remove a field in place. Fails on a frozen record.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        self.ensure_mutable(key)?;
        let inner = Rc::make_mut(&mut self.inner);
        Ok(inner
            .fields
            .shift_remove(key)
            .map(Rc::unwrap_or_clone))
    }

    /// Mutable access to a (possibly nested) field. Fails on a frozen record.
    pub fn get_mut(&mut self, key: &str) -> Result<Option<&mut Value>> {
        self.ensure_mutable(key)?;
        let inner = Rc::make_mut(&mut self.inner);
        Ok(inner.fields.get_mut(key).map(Rc::make_mut))
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Serialize as a flat JSON object.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| StoreError::InvalidRecord(e.to_string()))
    }

    /// Parse a JSON object into a record.
    pub fn from_json(text: &str) -> Result<Record> {
        serde_json::from_str(text).map_err(|e| StoreError::InvalidRecord(e.to_string()))
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

/// Field-wise value equality, ignoring identity, order and the frozen flag.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Record::ptr_eq(self, other) || self.inner.fields == other.inner.fields
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Compact JSON.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_fields(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Rc::new(v.into())))
                .collect(),
        )
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = IndexMap::<String, Value>::deserialize(deserializer)?;
        Ok(fields.into_iter().collect())
    }
}

// =============================================================================
// UPDATE / CHANGE
// =============================================================================

/// Boxed functional updater: current record in, partial record out.
pub type UpdateFn = Box<dyn FnOnce(&Record) -> Record>;

/// The argument of a store write.
///
/// Resolved exactly once per write, against the value the writer observes.
pub enum Update {
    /// Shallow-merge these fields over the current record.
    Patch(Record),
    /// Replace the whole record (used by reset, undo and redo).
    Replace(Record),
    /// Compute a patch from the current record.
    With(UpdateFn),
}

impl Update {
    /// Functional update.
    pub fn with(f: impl FnOnce(&Record) -> Record + 'static) -> Self {
        Update::With(Box::new(f))
    }

    /// Resolve against the current record.
    ///
    /// A functional updater runs here; if it panics nothing has been
    /// merged yet.
    pub fn resolve(self, current: &Record) -> Change {
        match self {
            Update::Patch(patch) => Change::Merge(patch),
            Update::Replace(next) => Change::Replace(next),
            Update::With(f) => Change::Merge(f(current)),
        }
    }
}

impl From<Record> for Update {
    fn from(patch: Record) -> Self {
        Update::Patch(patch)
    }
}

impl From<Change> for Update {
    fn from(change: Change) -> Self {
        match change {
            Change::Merge(patch) => Update::Patch(patch),
            Change::Replace(next) => Update::Replace(next),
        }
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Patch(r) => f.debug_tuple("Patch").field(r).finish(),
            Update::Replace(r) => f.debug_tuple("Replace").field(r).finish(),
            Update::With(_) => f.write_str("With(..)"),
        }
    }
}

/// A resolved update.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Merge(Record),
    Replace(Record),
}

impl Change {
    /// The record that results from applying this change to `current`.
    ///
    /// Always a new identity.
    pub fn apply(&self, current: &Record) -> Record {
        match self {
            Change::Merge(patch) => current.merge(patch),
            Change::Replace(next) => next.fresh_copy(),
        }
    }

    /// Compose two changes applied in order.
    pub fn then(self, next: Change) -> Change {
        match (self, next) {
            (_, Change::Replace(r)) => Change::Replace(r),
            (Change::Merge(a), Change::Merge(b)) => Change::Merge(a.merge(&b)),
            (Change::Replace(a), Change::Merge(b)) => Change::Replace(a.merge(&b)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
