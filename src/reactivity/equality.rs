// ============================================================================
// spark-store - Equality Functions
// Pluggable predicates for derived nodes and the distinct wrapper
// ============================================================================

use std::rc::Rc;

use serde_json::Value;

use crate::core::record::Record;

// =============================================================================
// STRICT EQUALITY (Default)
// =============================================================================

/// Default strict equality using PartialEq.
/// This is the default for `derived()`.
///
/// # Example
/// ```
/// use spark_store::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&42, &43));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// SHALLOW RECORD EQUALITY
// =============================================================================

/// Identity comparison for a single field value.
///
/// Scalars (null, bool, number, string) compare by value. Arrays and objects
/// are only equal if they are the very same value object - an equal-looking
/// copy from a new patch counts as a change.
fn same_value(a: &Rc<Value>, b: &Rc<Value>) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    match (a.as_ref(), b.as_ref()) {
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        (x, y) => x == y,
    }
}

/// Shallow key-by-key comparison of two records.
///
/// Same key count, and every field identical under [`same_value`]. This is
/// the default predicate of [`distinct`](crate::distinct).
///
/// # Example
/// ```
/// use spark_store::{record, reactivity::equality::shallow_equals};
///
/// let a = record! { "n" => 1, "tags" => vec!["x"] };
/// let b = a.merge(&record! { "n" => 1 });
/// let c = a.merge(&record! { "tags" => vec!["x"] });
///
/// assert!(shallow_equals(&a, &b));
/// assert!(!shallow_equals(&a, &c));
/// ```
pub fn shallow_equals(a: &Record, b: &Record) -> bool {
    if Record::ptr_eq(a, b) {
        return true;
    }
    let (left, right) = (a.fields(), b.fields());
    left.len() == right.len()
        && left
            .iter()
            .all(|(key, value)| right.get(key).is_some_and(|other| same_value(value, other)))
}

/// Record identity: equal only if both handles point at the same write.
pub fn identity_equals(a: &Record, b: &Record) -> bool {
    Record::ptr_eq(a, b)
}

// =============================================================================
// SAFE EQUALITY (Handles NaN)
// =============================================================================

/// Safe equality for f64 values.
/// Handles NaN correctly: NaN == NaN returns true.
///
/// Useful for derived nodes computing floating point values, where the
/// default PartialEq would notify on every NaN recomputation.
///
/// # Example
/// ```
/// use spark_store::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&1.0, &1.0));
/// assert!(!safe_equals_f64(&1.0, &2.0));
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

// =============================================================================
// FACTORY FUNCTIONS
// =============================================================================

/// Never equal - always returns false, forcing a notification on every
/// recomputation or write.
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// Always equal - always returns true, never notifying.
pub fn always_equals<T>(_a: &T, _b: &T) -> bool {
    true
}

/// Compare two records by a single field's value.
///
/// Returns a closure; wrap it in a fn item to use it as an [`EqualsFn`](crate::EqualsFn).
///
/// # Example
/// ```
/// use spark_store::{record, reactivity::equality::by_field};
///
/// let same_id = by_field("id");
/// assert!(same_id(&record! { "id" => 1, "name" => "a" }, &record! { "id" => 1, "name" => "b" }));
/// assert!(!same_id(&record! { "id" => 1 }, &record! { "id" => 2 }));
/// ```
pub fn by_field(key: &'static str) -> impl Fn(&Record, &Record) -> bool {
    move |a, b| a.get(key) == b.get(key)
}

// =============================================================================
// TESTS
// =============================================================================
