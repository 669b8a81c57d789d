// ============================================================================
// spark-store - Ergonomic Macros
// ============================================================================

/// Build a [`Record`](crate::Record) from `key => value` pairs.
///
/// Values go through `serde_json::json!`, so anything serializable works.
///
/// ```rust
/// use spark_store::record;
///
/// let r = record! { "count" => 1, "name" => "spark", "tags" => vec!["a", "b"] };
/// assert_eq!(r.len(), 3);
/// assert!(record! {}.is_empty());
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        <$crate::Record as ::std::iter::FromIterator<(::std::string::String, $crate::serde_json::Value)>>::from_iter([
            $( (::std::string::String::from($key), $crate::serde_json::json!($value)) ),+
        ])
    };
}

/// Helper macro to clone variables into a move closure.
///
/// This reduces the boilerplate of manually cloning store handles before
/// moving them into a closure.
///
/// # Usage
///
/// ```rust
/// use spark_store::{cloned, record, store, Readable, Writable};
///
/// let cell = store(record! { "n" => 0 });
/// let bump = cloned!(cell => move || {
///     cell.update(|s| record! { "n" => s.get_as::<i64>("n").unwrap_or(0) + 1 });
/// });
/// bump();
/// assert_eq!(cell.get(), record! { "n" => 1 });
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a derived node with automatic source capturing.
///
/// The listed sources become the node's sources and are bound, by value,
/// to the same names inside the body.
///
/// # Usage
///
/// ```rust
/// use spark_store::{derived, record, store, Readable, Writable};
///
/// let a = store(record! { "v" => 1 });
/// let b = store(record! { "v" => 2 });
///
/// let sum = derived!(a, b => a.get_as::<i64>("v").unwrap_or(0) + b.get_as::<i64>("v").unwrap_or(0));
/// assert_eq!(sum.get(), 3);
///
/// a.set(record! { "v" => 5 });
/// assert_eq!(sum.get(), 7);
/// ```
#[macro_export]
macro_rules! derived {
    ($($deps:ident),+ => $body:expr) => {
        $crate::derived(($($deps.clone(),)+), move |($($deps,)+)| $body)
    };
}
