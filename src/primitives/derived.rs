// ============================================================================
// spark-store - Derived Nodes
// Read-only values computed from one or more sources
// ============================================================================
//
// A derived node is eager: it computes once at construction and then again
// on every source notification (or once per flush when batched). It never
// recomputes speculatively and never reads untracked sources.
//
// Lifecycle:
//
//   Constructing --(all source subscriptions installed)--> Live
//   Live --(destroy() or last handle dropped)--> Destroyed
//
// While Constructing, the catch-up calls made by each source's `subscribe`
// are ignored: the initial value was already computed.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::core::types::{default_equals, EqualsFn, Listener, Readable, Unsubscribe};
use crate::primitives::notify::{after_pass, Subscribers};
use crate::reactivity::scheduling::schedule;

// =============================================================================
// SOURCES
// =============================================================================

/// A fixed set of sources a derived node reads from.
///
/// Implemented for tuples of up to six heterogeneous [`Readable`]s (the
/// compute function receives a tuple of their values, positionally) and
/// for `Vec<R>` of homogeneous ones.
pub trait Sources: 'static {
    type Values;

    /// Read every source fresh, in order.
    fn read(&self) -> Self::Values;

    /// Subscribe `handler` to every source, returning the teardowns.
    fn subscribe_all(&self, handler: Rc<dyn Fn()>) -> Vec<Unsubscribe>;
}

macro_rules! impl_sources_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> Sources for ($($name,)+)
        where
            $($name: Readable + 'static,)+
        {
            type Values = ($($name::Value,)+);

            fn read(&self) -> Self::Values {
                ($(self.$idx.get(),)+)
            }

            fn subscribe_all(&self, handler: Rc<dyn Fn()>) -> Vec<Unsubscribe> {
                vec![$({
                    let handler = Rc::clone(&handler);
                    let listener: Listener<$name::Value> =
                        Rc::new(move |_: &$name::Value| handler());
                    self.$idx.subscribe_listener(listener)
                }),+]
            }
        }
    };
}

impl_sources_tuple!(A: 0);
impl_sources_tuple!(A: 0, B: 1);
impl_sources_tuple!(A: 0, B: 1, C: 2);
impl_sources_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_sources_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_sources_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

impl<R: Readable + 'static> Sources for Vec<R> {
    type Values = Vec<R::Value>;

    fn read(&self) -> Self::Values {
        self.iter().map(Readable::get).collect()
    }

    fn subscribe_all(&self, handler: Rc<dyn Fn()>) -> Vec<Unsubscribe> {
        self.iter()
            .map(|source| {
                let handler = Rc::clone(&handler);
                let listener: Listener<R::Value> = Rc::new(move |_: &R::Value| handler());
                source.subscribe_listener(listener)
            })
            .collect()
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for creating a derived node.
pub struct DerivedOptions<T> {
    /// Gate for notifications: equal old/new values notify nobody.
    pub equals: EqualsFn<T>,
    /// Coalesce source notifications into one recompute per flush.
    pub batched: bool,
}

impl<T: PartialEq> Default for DerivedOptions<T> {
    fn default() -> Self {
        Self {
            equals: default_equals,
            batched: false,
        }
    }
}

/// Lifecycle state of a derived node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Constructing,
    Live,
    Destroyed,
}

// =============================================================================
// DERIVED INNER
// =============================================================================

/// The internal data for a derived node.
pub(crate) struct DerivedInner<T> {
    status: Cell<NodeStatus>,

    /// Cached value, replaced only after a successful recompute
    value: RefCell<T>,

    equals: EqualsFn<T>,

    /// Reads every source and applies the compute function
    recompute: Box<dyn Fn() -> T>,

    subscribers: Rc<Subscribers<T>>,

    /// Owned teardowns for the source subscriptions
    source_unsubscribers: RefCell<Vec<Unsubscribe>>,

    batched: bool,

    /// A batched recompute is scheduled
    pending: Cell<bool>,

    /// Our own notification is waiting for the current pass to end
    notify_queued: Cell<bool>,
}

impl<T: Clone + 'static> DerivedInner<T> {
    fn on_source_change(self: &Rc<Self>) {
        if self.status.get() != NodeStatus::Live {
            return;
        }

        if !self.batched {
            self.refresh();
            return;
        }

        if self.pending.replace(true) {
            return;
        }
        let weak = Rc::downgrade(self);
        schedule(move || {
            if let Some(inner) = weak.upgrade() {
                inner.flush_pending();
            }
        });
    }

    fn flush_pending(self: &Rc<Self>) {
        if !self.pending.replace(false) || self.status.get() != NodeStatus::Live {
            return;
        }
        self.refresh();
    }

    /// Recompute and notify if the value changed.
    fn refresh(self: &Rc<Self>) {
        // A panicking compute leaves the cached value untouched
        let candidate = (self.recompute)();
        let unchanged = (self.equals)(&self.value.borrow(), &candidate);
        if unchanged {
            return;
        }
        *self.value.borrow_mut() = candidate;

        if self.notify_queued.replace(true) {
            return;
        }
        let queued = QueuedNotify {
            node: Some(Rc::downgrade(self)),
        };
        after_pass(move || queued.deliver());
    }
}

/// A notification waiting for the current pass to end.
///
/// Dropping it undelivered (the post-pass queue is discarded when a listener
/// panics) clears the node's `notify_queued` flag so the next change queues
/// a fresh one.
struct QueuedNotify<T> {
    node: Option<Weak<DerivedInner<T>>>,
}

impl<T: Clone + 'static> QueuedNotify<T> {
    fn deliver(mut self) {
        let Some(inner) = self.node.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        inner.notify_queued.set(false);
        if inner.status.get() == NodeStatus::Live {
            let value = inner.value.borrow().clone();
            inner.subscribers.notify(&value);
        }
    }
}

impl<T> Drop for QueuedNotify<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.node.take().and_then(|weak| weak.upgrade()) {
            inner.notify_queued.set(false);
        }
    }
}

impl<T> DerivedInner<T> {
    fn teardown(&self) -> bool {
        if self.status.replace(NodeStatus::Destroyed) == NodeStatus::Destroyed {
            return false;
        }
        self.pending.set(false);

        let unsubscribers = std::mem::take(&mut *self.source_unsubscribers.borrow_mut());
        for unsubscribe in unsubscribers {
            unsubscribe.call();
        }
        self.subscribers.clear();
        true
    }
}

impl<T> Drop for DerivedInner<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// DERIVED<T> - The public handle
// =============================================================================

/// A read-only value computed from one or more sources.
///
/// # Example
///
/// ```
/// use spark_store::{derived, record, store, Readable, Writable};
///
/// let a = store(record! { "v" => 1 });
/// let b = store(record! { "v" => 2 });
/// let sum = derived((a.clone(), b.clone()), |(x, y)| {
///     x.get_as::<i64>("v").unwrap_or(0) + y.get_as::<i64>("v").unwrap_or(0)
/// });
///
/// assert_eq!(sum.get(), 3);
/// a.set(record! { "v" => 10 });
/// assert_eq!(sum.get(), 12);
/// ```
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Derived<T> {
    fn new<S, F>(sources: S, compute: F, options: DerivedOptions<T>) -> Self
    where
        S: Sources,
        F: Fn(S::Values) -> T + 'static,
    {
        let sources = Rc::new(sources);
        let recompute = {
            let sources = Rc::clone(&sources);
            move || compute(sources.read())
        };
        let initial = recompute();

        let inner = Rc::new(DerivedInner {
            status: Cell::new(NodeStatus::Constructing),
            value: RefCell::new(initial),
            equals: options.equals,
            recompute: Box::new(recompute),
            subscribers: Subscribers::new(),
            source_unsubscribers: RefCell::new(Vec::new()),
            batched: options.batched,
            pending: Cell::new(false),
            notify_queued: Cell::new(false),
        });

        let weak = Rc::downgrade(&inner);
        let handler: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_source_change();
            }
        });
        let unsubscribers = sources.subscribe_all(handler);
        *inner.source_unsubscribers.borrow_mut() = unsubscribers;
        inner.status.set(NodeStatus::Live);

        Self { inner }
    }

    /// Detach from every source and drop every subscriber.
    ///
    /// The value stays readable, frozen at the last computed value.
    /// Idempotent.
    pub fn destroy(&self) {
        if self.inner.teardown() {
            debug!("derived node destroyed");
        }
    }

    pub fn status(&self) -> NodeStatus {
        self.inner.status.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.status() == NodeStatus::Destroyed
    }

    /// Whether a batched recompute is waiting for the next flush.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Whether two handles refer to the same node.
    pub fn ptr_eq(a: &Derived<T>, b: &Derived<T>) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<T: Clone + 'static> Readable for Derived<T> {
    type Value = T;

    fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Each subscription remembers the last value it was given and skips
    /// deliveries equal to it, so a value that changes and changes back
    /// within one pass, or a subscriber that joined mid-pass, is not told
    /// about a value it already holds.
    fn subscribe_listener(&self, listener: Listener<T>) -> Unsubscribe {
        let current = self.get();
        if self.is_destroyed() {
            listener(&current);
            return Unsubscribe::noop();
        }

        let equals = self.inner.equals;
        let last_seen: RefCell<Option<T>> = RefCell::new(None);
        let gated: Listener<T> = Rc::new(move |value: &T| {
            let unchanged = last_seen
                .borrow()
                .as_ref()
                .is_some_and(|seen| equals(seen, value));
            if unchanged {
                return;
            }
            *last_seen.borrow_mut() = Some(value.clone());
            listener(value);
        });
        self.inner.subscribers.subscribe(gated, &current)
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("value", &self.get())
            .field("status", &self.status())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a derived node over `sources`.
///
/// Subscribers are notified only when the new value differs (PartialEq)
/// from the cached one.
pub fn derived<S, T, F>(sources: S, compute: F) -> Derived<T>
where
    S: Sources,
    T: Clone + PartialEq + 'static,
    F: Fn(S::Values) -> T + 'static,
{
    Derived::new(sources, compute, DerivedOptions::default())
}

/// Create a derived node with a custom equality function.
pub fn derived_with_equals<S, T, F>(sources: S, compute: F, equals: EqualsFn<T>) -> Derived<T>
where
    S: Sources,
    T: Clone + 'static,
    F: Fn(S::Values) -> T + 'static,
{
    Derived::new(
        sources,
        compute,
        DerivedOptions {
            equals,
            batched: false,
        },
    )
}

/// Create a derived node that recomputes at most once per flush.
///
/// # Example
///
/// ```
/// use spark_store::{derived_batched, record, store, tick, Readable, Writable};
///
/// let a = store(record! { "v" => 1 });
/// let twice = derived_batched((a.clone(),), |(s,)| s.get_as::<i64>("v").unwrap_or(0) * 2);
///
/// a.set(record! { "v" => 2 });
/// a.set(record! { "v" => 3 });
/// assert_eq!(twice.get(), 2);
///
/// tick().unwrap();
/// assert_eq!(twice.get(), 6);
/// ```
pub fn derived_batched<S, T, F>(sources: S, compute: F) -> Derived<T>
where
    S: Sources,
    T: Clone + PartialEq + 'static,
    F: Fn(S::Values) -> T + 'static,
{
    Derived::new(
        sources,
        compute,
        DerivedOptions {
            batched: true,
            ..DerivedOptions::default()
        },
    )
}

/// Create a derived node from explicit options.
pub fn derived_with_options<S, T, F>(sources: S, compute: F, options: DerivedOptions<T>) -> Derived<T>
where
    S: Sources,
    T: Clone + 'static,
    F: Fn(S::Values) -> T + 'static,
{
    Derived::new(sources, compute, options)
}

/// Single-source shorthand for [`derived`].
///
/// # Example
///
/// ```
/// use spark_store::{record, select, store, Readable, Writable};
///
/// let cell = store(record! { "count" => 5 });
/// let doubled = select(cell.clone(), |s| s.get_as::<i64>("count").unwrap_or(0) * 2);
/// assert_eq!(doubled.get(), 10);
///
/// cell.set(record! { "count" => 7 });
/// assert_eq!(doubled.get(), 14);
/// ```
pub fn select<R, T, F>(source: R, f: F) -> Derived<T>
where
    R: Readable + 'static,
    T: Clone + PartialEq + 'static,
    F: Fn(R::Value) -> T + 'static,
{
    derived((source,), move |(value,)| f(value))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Record;
    use crate::core::types::Writable;
    use crate::primitives::store::{store, Store};
    use crate::reactivity::scheduling::tick;
    use crate::record;

    fn v(r: &Record) -> i64 {
        r.get_as::<i64>("v").unwrap_or(0)
    }

    fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        (count, move || count_clone.set(count_clone.get() + 1))
    }

    #[test]
    fn computes_initial_value_once() {
        let a = store(record! { "v" => 3 });
        let (computes, bump) = counter();
        let d = select(a.clone(), move |s| {
            bump();
            v(&s) * 2
        });

        assert_eq!(d.get(), 6);
        assert_eq!(computes.get(), 1);
        assert_eq!(d.status(), NodeStatus::Live);
    }

    #[test]
    fn recomputes_on_source_write() {
        let a = store(record! { "v" => 1 });
        let d = select(a.clone(), |s| v(&s) + 100);
        a.set(record! { "v" => 2 });
        assert_eq!(d.get(), 102);
    }

    #[test]
    fn construction_does_not_notify_or_recompute() {
        let a = store(record! { "v" => 1 });
        let b = store(record! { "v" => 2 });
        let (computes, bump) = counter();
        let d = derived((a.clone(), b.clone()), move |(x, y)| {
            bump();
            v(&x) + v(&y)
        });

        assert_eq!(computes.get(), 1);
        assert_eq!(d.get(), 3);
    }

    #[test]
    fn multi_source_reads_all_sources_fresh() {
        let a = store(record! { "v" => 1 });
        let b = store(record! { "v" => 2 });
        let sum = derived((a.clone(), b.clone()), |(x, y)| v(&x) + v(&y));

        a.set(record! { "v" => 10 });
        assert_eq!(sum.get(), 10 + v(&b.get()));
        b.set(record! { "v" => 5 });
        assert_eq!(sum.get(), 15);
    }

    #[test]
    fn heterogeneous_tuple_sources() {
        let a = store(record! { "name" => "spark" });
        let len = select(a.clone(), |s| s.get_as::<String>("name").unwrap_or_default().len());
        let label = derived((a.clone(), len.clone()), |(s, n)| {
            format!("{}:{}", s.get_as::<String>("name").unwrap_or_default(), n)
        });

        assert_eq!(label.get(), "spark:5");
        a.set(record! { "name" => "store!" });
        assert_eq!(label.get(), "store!:6");
    }

    #[test]
    fn vec_sources_are_positional() {
        let cells: Vec<Store> = (0..3).map(|i| store(record! { "v" => i })).collect();
        let joined = derived(cells.clone(), |values| {
            values.iter().map(|r| v(r).to_string()).collect::<Vec<_>>().join(",")
        });

        assert_eq!(joined.get(), "0,1,2");
        cells[1].set(record! { "v" => 9 });
        assert_eq!(joined.get(), "0,9,2");
    }

    #[test]
    fn equality_gates_notifications() {
        let a = store(record! { "v" => 1, "other" => 0 });
        let d = select(a.clone(), |s| v(&s));
        let (calls, bump) = counter();
        d.subscribe(move |_| bump());

        a.set(record! { "other" => 1 });
        a.set(record! { "other" => 2 });
        assert_eq!(calls.get(), 1);

        a.set(record! { "v" => 2 });
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn custom_equality() {
        let a = store(record! { "v" => 1 });
        let d = derived_with_equals((a.clone(),), |(s,)| v(&s), |_, _| false);
        let (calls, bump) = counter();
        d.subscribe(move |_| bump());

        a.set(record! { "other" => true });
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn destroy_detaches_and_freezes_value() {
        let a = store(record! { "v" => 1 });
        let d = select(a.clone(), |s| v(&s));
        let (calls, bump) = counter();
        d.subscribe(move |_| bump());
        assert_eq!(a.subscriber_count(), 1);

        d.destroy();
        d.destroy();
        a.set(record! { "v" => 50 });

        assert_eq!(d.get(), 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(d.subscriber_count(), 0);
        assert!(d.is_destroyed());
    }

    #[test]
    fn subscribe_after_destroy_gets_only_catch_up() {
        let a = store(record! { "v" => 4 });
        let d = select(a.clone(), |s| v(&s));
        d.destroy();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let unsub = d.subscribe(move |x| seen_clone.borrow_mut().push(*x));
        a.set(record! { "v" => 5 });

        assert_eq!(*seen.borrow(), vec![4]);
        assert!(!unsub.is_active());
    }

    #[test]
    fn dropping_last_handle_detaches_from_sources() {
        let a = store(record! { "v" => 1 });
        {
            let _d = select(a.clone(), |s| v(&s));
            assert_eq!(a.subscriber_count(), 1);
        }
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn derived_of_derived_chain() {
        let a = store(record! { "v" => 1 });
        let b = select(a.clone(), |s| v(&s) * 2);
        let c = select(b.clone(), |x| x + 10);

        assert_eq!(c.get(), 12);
        a.set(record! { "v" => 5 });
        assert_eq!(c.get(), 20);
    }

    #[test]
    fn diamond_notifies_once_with_consistent_value() {
        let a = store(record! { "v" => 1 });
        let b = select(a.clone(), |s| v(&s) + 10);
        let c = select(a.clone(), |s| v(&s) * 10);
        let d = derived((b.clone(), c.clone()), |(x, y)| x + y);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        d.subscribe(move |x| seen_clone.borrow_mut().push(*x));

        a.set(record! { "v" => 2 });
        assert_eq!(d.get(), 32);
        assert_eq!(*seen.borrow(), vec![21, 32]);
    }

    #[test]
    fn notification_waits_for_source_pass() {
        let a = store(record! { "v" => 1 });
        let log = Rc::new(RefCell::new(Vec::new()));
        let d = select(a.clone(), |s| v(&s));

        let log_d = log.clone();
        d.subscribe(move |x| log_d.borrow_mut().push(format!("derived:{x}")));
        let log_a = log.clone();
        a.subscribe(move |s| log_a.borrow_mut().push(format!("source:{}", v(s))));
        log.borrow_mut().clear();

        a.set(record! { "v" => 2 });
        assert_eq!(*log.borrow(), vec!["source:2", "derived:2"]);
    }

    #[test]
    fn batched_recomputes_once_per_flush() {
        let a = store(record! { "v" => 0 });
        let b = store(record! { "v" => 0 });
        let (computes, bump) = counter();
        let d = derived_batched((a.clone(), b.clone()), move |(x, y)| {
            bump();
            v(&x) + v(&y)
        });
        let (calls, notify) = counter();
        d.subscribe(move |_| notify());

        a.set(record! { "v" => 1 });
        b.set(record! { "v" => 2 });
        a.set(record! { "v" => 3 });
        assert!(d.is_pending());
        assert_eq!(d.get(), 0);

        tick().unwrap();
        assert_eq!(d.get(), 5);
        assert_eq!(computes.get(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn destroy_cancels_pending_batched_recompute() {
        let a = store(record! { "v" => 0 });
        let d = derived_batched((a.clone(),), |(s,)| v(&s));
        a.set(record! { "v" => 1 });
        d.destroy();

        tick().unwrap();
        assert_eq!(d.get(), 0);
        assert!(!d.is_pending());
    }

    #[test]
    fn value_restored_within_pass_is_not_renotified() {
        let a = store(record! { "v" => 0 });
        let d = select(a.clone(), |s| v(&s));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        d.subscribe(move |x| seen_clone.borrow_mut().push(*x));

        // Bounce 1 straight back to 0 before the pass ends
        let a_clone = a.clone();
        a.subscribe(move |s| {
            if v(s) == 1 {
                a_clone.set(record! { "v" => 0 });
            }
        });

        a.set(record! { "v" => 1 });
        assert_eq!(d.get(), 0);
        assert_eq!(*seen.borrow(), vec![0]);

        a.set(record! { "v" => 2 });
        assert_eq!(*seen.borrow(), vec![0, 2]);
    }

    #[test]
    fn subscriber_joining_mid_pass_is_not_told_twice() {
        let a = store(record! { "v" => 0 });
        let d = select(a.clone(), |s| v(&s));
        let _early = d.subscribe(|_| {});

        let seen = Rc::new(RefCell::new(Vec::new()));
        let joined = Rc::new(Cell::new(false));
        let (d_clone, seen_clone, joined_clone) = (d.clone(), seen.clone(), joined.clone());
        a.subscribe(move |s| {
            if v(s) == 1 && !joined_clone.replace(true) {
                let seen_inner = seen_clone.clone();
                d_clone.subscribe(move |x| seen_inner.borrow_mut().push(*x));
            }
        });

        a.set(record! { "v" => 1 });
        assert_eq!(*seen.borrow(), vec![1]);

        a.set(record! { "v" => 3 });
        assert_eq!(*seen.borrow(), vec![1, 3]);
    }

    #[test]
    fn listener_panic_drops_queued_notification() {
        let a = store(record! { "v" => 0 });
        let other = store(record! { "x" => 0 });
        let d = select(a.clone(), |s| v(&s));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        d.subscribe(move |x| seen_clone.borrow_mut().push(*x));
        a.subscribe(|s| assert!(v(s) != 1, "listener failure"));

        let a_clone = a.clone();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            a_clone.set(record! { "v" => 1 });
        }));
        assert!(outcome.is_err());
        assert_eq!(d.get(), 1);

        // Nothing leaks into an unrelated write
        other.set(record! { "x" => 1 });
        assert_eq!(*seen.borrow(), vec![0]);

        // The node is not stuck: the next change is delivered
        a.set(record! { "v" => 2 });
        assert_eq!(*seen.borrow(), vec![0, 2]);
    }

    #[test]
    fn panicking_compute_keeps_cached_value() {
        let a = store(record! { "v" => 1 });
        let d = select(a.clone(), |s| {
            let n = v(&s);
            assert!(n < 100, "value too large");
            n
        });

        let a_clone = a.clone();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            a_clone.set(record! { "v" => 500 });
        }));

        assert!(outcome.is_err());
        assert_eq!(d.get(), 1);
        a.set(record! { "v" => 2 });
        assert_eq!(d.get(), 2);
    }
}
