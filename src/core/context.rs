// ============================================================================
// spark-store - Reactive Context
// Thread-local state for the cooperative deferred-task queue
// ============================================================================
//
// Two queues live here, one per thread:
// - deferred: batched stores and batched derived nodes defer their work to
//   "the end of the current turn". Rust has no ambient microtask queue, so
//   this FIFO stands in for it and is drained by `tick()`.
// - post_pass: derived-node notifications raised while a notification pass
//   is running, delivered once the outermost pass completes.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// Thread-local reactive context holding the deferred and post-pass queues.
pub struct ReactiveContext {
    /// Tasks waiting for the next flush, in scheduling order
    pub deferred: RefCell<VecDeque<Task>>,

    /// Whether a flush is currently draining the queue
    pub flushing: Cell<bool>,

    // =========================================================================
    // NOTIFICATION PASSES
    // =========================================================================
    /// Depth of nested notification passes currently running
    pub pass_depth: Cell<u32>,

    /// Notifications held back until the outermost pass completes
    pub post_pass: RefCell<VecDeque<Task>>,

    /// Whether the post-pass queue is being drained
    pub draining_post_pass: Cell<bool>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            deferred: RefCell::new(VecDeque::new()),
            flushing: Cell::new(false),
            pass_depth: Cell::new(0),
            post_pass: RefCell::new(VecDeque::new()),
            draining_post_pass: Cell::new(false),
        }
    }

    // =========================================================================
    // DEFERRED QUEUE
    // =========================================================================

    /// Append a task to the queue.
    pub fn push_task(&self, task: Task) {
        self.deferred.borrow_mut().push_back(task);
    }

    /// Pop the oldest task.
    pub fn pop_task(&self) -> Option<Task> {
        self.deferred.borrow_mut().pop_front()
    }

    /// Drop every queued task without running it.
    pub fn clear_tasks(&self) -> usize {
        // Drop outside the borrow; a task's captures may own store handles
        let dropped = std::mem::take(&mut *self.deferred.borrow_mut());
        dropped.len()
    }

    pub fn pending_count(&self) -> usize {
        self.deferred.borrow().len()
    }

    // =========================================================================
    // FLUSH STATE
    // =========================================================================

    /// Set the flushing flag, returning the previous value
    pub fn set_flushing(&self, flushing: bool) -> bool {
        self.flushing.replace(flushing)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    // =========================================================================
    // NOTIFICATION PASSES
    // =========================================================================

    /// Enter a notification pass, returning the new depth
    pub fn enter_pass(&self) -> u32 {
        let depth = self.pass_depth.get() + 1;
        self.pass_depth.set(depth);
        depth
    }

    /// Exit a notification pass, returning the new depth
    pub fn exit_pass(&self) -> u32 {
        let depth = self.pass_depth.get().saturating_sub(1);
        self.pass_depth.set(depth);
        depth
    }

    pub fn in_pass(&self) -> bool {
        self.pass_depth.get() > 0
    }

    pub fn push_post_pass(&self, task: Task) {
        self.post_pass.borrow_mut().push_back(task);
    }

    pub fn pop_post_pass(&self) -> Option<Task> {
        self.post_pass.borrow_mut().pop_front()
    }

    /// Take the whole post-pass queue, leaving it empty.
    pub fn take_post_pass(&self) -> VecDeque<Task> {
        std::mem::take(&mut *self.post_pass.borrow_mut())
    }

    /// Set the draining flag, returning the previous value
    pub fn set_draining_post_pass(&self, draining: bool) -> bool {
        self.draining_post_pass.replace(draining)
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    /// The thread-local reactive context
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
///
/// Never run user code inside the closure: tasks may schedule more tasks.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Check if the deferred queue is being drained right now.
pub fn is_flushing() -> bool {
    with_context(|ctx| ctx.is_flushing())
}

/// Number of tasks waiting for the next flush.
pub fn pending_tasks() -> usize {
    with_context(|ctx| ctx.pending_count())
}

// =============================================================================
// TESTS
// =============================================================================
