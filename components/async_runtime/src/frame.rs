//! Frame callback scheduling.
//!
//! Frame callbacks are single-shot: everything registered since the last
//! frame fires together, in registration order, at the next frame boundary.
//! Callbacks registered while a batch is running are deferred to the next
//! batch. While the host reports itself inactive (backgrounded), frames
//! never fire and registrations are retained.

use crate::task::{Task, TaskCallback, TaskId, TaskIdAllocator};
use core_types::{RuntimeError, Value};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Cancellable handle to a registered frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(TaskId);

impl FrameHandle {
    /// The task id assigned at registration.
    pub fn id(&self) -> TaskId {
        self.0
    }
}

struct FrameEntry {
    handle: FrameHandle,
    label: String,
    cancelled: Rc<Cell<bool>>,
    callback: TaskCallback,
}

/// Scheduler for once-per-frame callbacks.
pub struct FrameScheduler {
    pending: Vec<FrameEntry>,
    /// Cancellation flags of entries not yet run, including the batch
    /// currently being executed by the loop.
    live_flags: HashMap<FrameHandle, Rc<Cell<bool>>>,
    last_batch: Vec<FrameHandle>,
    active: bool,
    ids: TaskIdAllocator,
}

impl FrameScheduler {
    /// Creates an active frame scheduler minting ids from the allocator.
    pub fn new(ids: TaskIdAllocator) -> Self {
        Self {
            pending: Vec::new(),
            live_flags: HashMap::new(),
            last_batch: Vec::new(),
            active: true,
            ids,
        }
    }

    /// Registers a callback for the next frame.
    ///
    /// Single-shot: the registration is cleared when it fires. Callers that
    /// animate re-request a frame from within the callback; such requests
    /// land in the next batch, never the current one.
    pub fn request_frame<F>(&mut self, callback: F) -> FrameHandle
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        let id = self.ids.next_id();
        let handle = FrameHandle(id);
        let cancelled = Rc::new(Cell::new(false));
        self.live_flags.insert(handle, cancelled.clone());
        self.pending.push(FrameEntry {
            handle,
            label: format!("frame#{}", id),
            cancelled,
            callback: Box::new(callback),
        });
        handle
    }

    /// Cancels a registered frame callback.
    ///
    /// Idempotent: unknown, already-fired, and already-cancelled handles are
    /// no-ops. Cancelling from within a frame callback suppresses a
    /// not-yet-run callback of the same batch.
    pub fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(flag) = self.live_flags.remove(&handle) {
            flag.set(true);
        }
    }

    /// Reports whether frames currently fire at all.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Toggles frame firing; `false` models a backgrounded host.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Returns true while any registration is pending.
    pub fn has_registrations(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of pending registrations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Takes the current batch as macrotask-shaped units, in registration
    /// order. Registrations made after this call belong to the next batch.
    ///
    /// Returns an empty batch while inactive.
    pub fn take_batch(&mut self) -> Vec<Task> {
        if !self.active {
            return Vec::new();
        }
        for handle in self.last_batch.drain(..) {
            self.live_flags.remove(&handle);
        }
        let batch = std::mem::take(&mut self.pending);
        self.last_batch = batch.iter().map(|entry| entry.handle).collect();
        batch
            .into_iter()
            .map(|entry| {
                Task::with_cancel_flag(
                    entry.handle.id(),
                    entry.label,
                    entry.cancelled,
                    entry.callback,
                )
            })
            .collect()
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending.len())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
