//! Deferred units of work.
//!
//! This module provides the task and microtask wrappers executed by the event
//! loop, plus the shared id allocator that gives every scheduled unit a
//! unique, monotonically increasing identity.

use core_types::{RuntimeError, Value};
use std::cell::Cell;
use std::rc::Rc;

/// The callback carried by a task: invoked exactly once, producing a value or
/// a runtime error.
pub type TaskCallback = Box<dyn FnOnce() -> Result<Value, RuntimeError>>;

/// Unique identifier of a scheduled unit of work.
///
/// Ids are minted by a [`TaskIdAllocator`] and increase monotonically across
/// every queue of the owning loop, so they double as a scheduling-order
/// witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(
    /// Raw id value.
    pub u64,
);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared id source for every scheduled unit of one loop.
///
/// Cloning the allocator shares the counter; ids stay unique across clones.
#[derive(Debug, Clone, Default)]
pub struct TaskIdAllocator {
    next: Rc<Cell<u64>>,
}

impl TaskIdAllocator {
    /// Creates a new allocator starting at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next id.
    pub fn next_id(&self) -> TaskId {
        let id = self.next.get();
        self.next.set(id + 1);
        TaskId(id)
    }
}

/// A macrotask to be executed by the event loop.
///
/// Tasks represent work done one-per-iteration of the event loop: timer
/// firings and externally posted events.
pub struct Task {
    id: TaskId,
    label: String,
    cancelled: Rc<Cell<bool>>,
    callback: TaskCallback,
}

impl Task {
    /// Creates a new task from a closure.
    pub fn new<F>(id: TaskId, label: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        Self::with_cancel_flag(id, label, Rc::new(Cell::new(false)), Box::new(f))
    }

    /// Creates a task whose cancellation is controlled by a shared flag.
    ///
    /// The flag is checked by the loop immediately before invocation, so
    /// cancelling after the task was queued still prevents it from running.
    pub fn with_cancel_flag(
        id: TaskId,
        label: impl Into<String>,
        cancelled: Rc<Cell<bool>>,
        callback: TaskCallback,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            cancelled,
            callback,
        }
    }

    /// The task's unique id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The label used for call-stack frames and error reports.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Executes the task, consuming it.
    pub fn run(self) -> Result<Value, RuntimeError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("cancelled", &self.cancelled.get())
            .finish_non_exhaustive()
    }
}

/// A microtask to be executed by the event loop.
///
/// Microtasks have the highest scheduling priority: the queue is drained to
/// exhaustion after every macrotask, before anything else runs. Promise
/// reactions are dispatched this way.
pub struct Microtask {
    id: TaskId,
    label: String,
    callback: TaskCallback,
}

impl Microtask {
    /// Creates a new microtask from a closure.
    pub fn new<F>(id: TaskId, label: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        Self {
            id,
            label: label.into(),
            callback: Box::new(f),
        }
    }

    /// The microtask's unique id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The label used for call-stack frames and error reports.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Executes the microtask, consuming it.
    pub fn run(self) -> Result<Value, RuntimeError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Microtask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Microtask")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
