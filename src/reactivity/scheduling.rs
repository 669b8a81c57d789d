// ============================================================================
// spark-store - Deferred Scheduling
// The cooperative "end of turn" checkpoint used by batching
// ============================================================================
//
// A batched store's write returns right after queuing; the merge and the
// notification happen at the next checkpoint. In a host with a real event
// loop the checkpoint is "after the current callback". Here it is explicit:
//
// - schedule: queue a task for the next checkpoint
// - tick: drain the queue (tasks queued while draining run in the same tick)
// - turn: run a closure as one synchronous turn, then tick
// ============================================================================

use tracing::{trace, warn};

use crate::core::context::{with_context, Task};
use crate::core::error::{Result, StoreError};

/// Maximum drain rounds before we consider it an infinite loop.
///
/// A round runs every task that was queued when the round started; tasks
/// queued by those go to the next round.
pub const MAX_FLUSH_COUNT: u32 = 1000;

// =============================================================================
// SCHEDULE
// =============================================================================

/// Queue a task for the next checkpoint.
///
/// There is no cancellation: once queued, a task runs at the next `tick()`.
pub fn schedule(task: impl FnOnce() + 'static) {
    with_context(|ctx| ctx.push_task(Box::new(task) as Task));
}

/// Whether anything is waiting for the next checkpoint.
pub fn has_pending() -> bool {
    with_context(|ctx| ctx.pending_count() > 0)
}

// =============================================================================
// TICK
// =============================================================================

/// Run every deferred task, including those queued while running.
///
/// Calling `tick()` from inside a task is a no-op: the outer drain picks up
/// whatever was queued. Returns [`StoreError::FlushLimit`] (dropping the
/// remaining tasks) if tasks keep re-scheduling for more than
/// [`MAX_FLUSH_COUNT`] rounds.
///
/// # Example
///
/// ```
/// use spark_store::{batched, record, store, tick, Readable, Writable};
///
/// let cell = batched(store(record! { "count" => 0 }));
/// cell.set(record! { "count" => 1 });
/// assert_eq!(cell.committed(), record! { "count" => 0 });
///
/// tick().unwrap();
/// assert_eq!(cell.committed(), record! { "count" => 1 });
/// ```
pub fn tick() -> Result<()> {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));
    if was_flushing {
        return Ok(());
    }

    // Use a guard pattern so a panicking task doesn't leave us "flushing"
    struct FlushGuard;

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_flushing(false));
        }
    }

    let _guard = FlushGuard;
    let mut rounds = 0u32;

    loop {
        let batch = with_context(|ctx| ctx.pending_count());
        if batch == 0 {
            return Ok(());
        }

        rounds += 1;
        if rounds > MAX_FLUSH_COUNT {
            let dropped = with_context(|ctx| ctx.clear_tasks());
            warn!(dropped, "deferred flush did not settle; dropping queued tasks");
            return Err(StoreError::FlushLimit {
                limit: MAX_FLUSH_COUNT,
            });
        }

        trace!(round = rounds, tasks = batch, "draining deferred tasks");
        for _ in 0..batch {
            // Pop outside of the task call to avoid nested borrows
            let Some(task) = with_context(|ctx| ctx.pop_task()) else {
                break;
            };
            task();
        }
    }
}

// =============================================================================
// TURN
// =============================================================================

/// Run `f` as one synchronous turn, then reach the checkpoint.
///
/// # Example
///
/// ```
/// use spark_store::{batched, record, store, turn, Readable, Writable};
///
/// let cell = batched(store(record! { "a" => 0, "b" => 0 }));
/// turn(|| {
///     cell.set(record! { "a" => 1 });
///     cell.set(record! { "b" => 2 });
/// })
/// .unwrap();
/// assert_eq!(cell.committed(), record! { "a" => 1, "b" => 2 });
/// ```
pub fn turn<T>(f: impl FnOnce() -> T) -> Result<T> {
    let out = f();
    tick()?;
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn tick_runs_tasks_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            schedule(move || log.borrow_mut().push(i));
        }
        assert!(has_pending());
        assert!(log.borrow().is_empty());

        tick().unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(!has_pending());
    }

    #[test]
    fn tasks_scheduled_during_tick_run_in_same_tick() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        schedule(move || {
            log_clone.borrow_mut().push("outer");
            let log_inner = log_clone.clone();
            schedule(move || log_inner.borrow_mut().push("inner"));
        });

        tick().unwrap();
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn nested_tick_is_noop() {
        let ran = Rc::new(Cell::new(0));
        let ran_clone = ran.clone();
        schedule(move || {
            ran_clone.set(ran_clone.get() + 1);
            tick().unwrap();
        });
        tick().unwrap();
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn runaway_rescheduling_hits_flush_limit() {
        fn respawn() {
            schedule(respawn);
        }
        schedule(respawn);

        assert_eq!(
            tick(),
            Err(StoreError::FlushLimit {
                limit: MAX_FLUSH_COUNT
            })
        );
        assert!(!has_pending());
        // Queue is usable again
        tick().unwrap();
    }

    #[test]
    fn turn_returns_value_and_flushes() {
        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        let out = turn(|| {
            schedule(move || ran_clone.set(true));
            42
        })
        .unwrap();
        assert_eq!(out, 42);
        assert!(ran.get());
    }
}
