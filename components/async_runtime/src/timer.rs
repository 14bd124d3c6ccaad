//! Timer management.
//!
//! The timer manager owns every armed one-shot and recurring timer, ordered
//! by due time with a stable FIFO tie-break: timers sharing a due time fire
//! in the order they were scheduled. Due timers are handed to the event loop
//! as macrotasks, one per loop iteration.

use crate::error::ScheduleError;
use crate::task::{Task, TaskCallback, TaskId, TaskIdAllocator};
use core_types::{RuntimeError, Value};
use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;

/// Cancellable handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(TaskId);

impl TimerHandle {
    /// The task id assigned when the timer was scheduled. Recurring timers
    /// keep it across firings.
    pub fn id(&self) -> TaskId {
        self.0
    }
}

type RecurringCallback = Rc<RefCell<dyn FnMut() -> Result<Value, RuntimeError>>>;

enum TimerKind {
    Once { callback: Option<TaskCallback> },
    Recurring { callback: RecurringCallback, interval_ms: u64 },
}

struct TimerState {
    kind: TimerKind,
    cancelled: Rc<Cell<bool>>,
    label: String,
}

/// Heap entry ordering: due time first, then scheduling sequence, so equal
/// due times fire in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    due_ms: u64,
    seq: u64,
    handle: TimerHandle,
}

/// Owner of scheduled one-shot and recurring timers.
pub struct TimerManager {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    timers: HashMap<TimerHandle, TimerState>,
    ids: TaskIdAllocator,
    next_seq: u64,
    min_delay_ms: u64,
}

impl TimerManager {
    /// Creates a timer manager minting ids from the given allocator.
    ///
    /// `min_delay_ms` is an enforced delay floor applied to every delay and
    /// interval, emulating host clamping. The default configuration uses 0.
    pub fn new(ids: TaskIdAllocator, min_delay_ms: u64) -> Self {
        Self {
            heap: BinaryHeap::new(),
            timers: HashMap::new(),
            ids,
            next_seq: 0,
            min_delay_ms,
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Schedules a one-shot timer due `delay_ms` after `now_ms`.
    pub fn schedule_once<F>(&mut self, callback: F, delay_ms: u64, now_ms: u64) -> TimerHandle
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        let id = self.ids.next_id();
        let handle = TimerHandle(id);
        let due_ms = now_ms + delay_ms.max(self.min_delay_ms);
        let seq = self.bump_seq();
        self.heap.push(Reverse(HeapEntry {
            due_ms,
            seq,
            handle,
        }));
        self.timers.insert(
            handle,
            TimerState {
                kind: TimerKind::Once {
                    callback: Some(Box::new(callback)),
                },
                cancelled: Rc::new(Cell::new(false)),
                label: format!("timeout#{}", id),
            },
        );
        handle
    }

    /// Schedules a recurring timer first due `interval_ms` after `now_ms`.
    ///
    /// Fails fast with [`ScheduleError::InvalidInterval`] when the interval
    /// is zero; it is never silently coerced.
    pub fn schedule_recurring<F>(
        &mut self,
        callback: F,
        interval_ms: u64,
        now_ms: u64,
    ) -> Result<TimerHandle, ScheduleError>
    where
        F: FnMut() -> Result<Value, RuntimeError> + 'static,
    {
        if interval_ms == 0 {
            return Err(ScheduleError::InvalidInterval);
        }
        let interval_ms = interval_ms.max(self.min_delay_ms);
        let id = self.ids.next_id();
        let handle = TimerHandle(id);
        let seq = self.bump_seq();
        self.heap.push(Reverse(HeapEntry {
            due_ms: now_ms + interval_ms,
            seq,
            handle,
        }));
        self.timers.insert(
            handle,
            TimerState {
                kind: TimerKind::Recurring {
                    callback: Rc::new(RefCell::new(callback)),
                    interval_ms,
                },
                cancelled: Rc::new(Cell::new(false)),
                label: format!("interval#{}", id),
            },
        );
        Ok(handle)
    }

    /// Cancels a timer.
    ///
    /// Idempotent: cancelling an unknown, already-fired, or already-cancelled
    /// handle is a no-op. A firing already handed to the loop but not yet run
    /// is suppressed through the shared cancellation flag.
    pub fn cancel(&mut self, handle: TimerHandle) {
        if let Some(state) = self.timers.remove(&handle) {
            state.cancelled.set(true);
        }
    }

    /// Pops the single most-due timer at `now_ms` as a macrotask, if any.
    ///
    /// Recurring timers re-arm immediately with `due += interval` and the
    /// same handle; stale heap entries left behind by cancellation are
    /// discarded along the way.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Task> {
        loop {
            match self.heap.peek() {
                Some(Reverse(top)) if top.due_ms <= now_ms => {}
                _ => return None,
            }
            let Some(Reverse(entry)) = self.heap.pop() else {
                return None;
            };
            let Some(state) = self.timers.remove(&entry.handle) else {
                continue; // cancelled or already fired
            };
            if state.cancelled.get() {
                continue;
            }
            let cancelled = state.cancelled.clone();
            let label = state.label.clone();
            let callback: TaskCallback = match state.kind {
                TimerKind::Once { callback } => match callback {
                    Some(callback) => callback,
                    None => continue,
                },
                TimerKind::Recurring {
                    callback,
                    interval_ms,
                } => {
                    let shared = Rc::clone(&callback);
                    let seq = self.bump_seq();
                    self.heap.push(Reverse(HeapEntry {
                        due_ms: entry.due_ms + interval_ms,
                        seq,
                        handle: entry.handle,
                    }));
                    self.timers.insert(
                        entry.handle,
                        TimerState {
                            kind: TimerKind::Recurring {
                                callback,
                                interval_ms,
                            },
                            cancelled: cancelled.clone(),
                            label: label.clone(),
                        },
                    );
                    Box::new(move || (&mut *shared.borrow_mut())())
                }
            };
            return Some(Task::with_cancel_flag(
                entry.handle.id(),
                label,
                cancelled,
                callback,
            ));
        }
    }

    /// Returns the due time of the earliest live timer, discarding stale
    /// heap entries along the way.
    pub fn next_due_ms(&mut self) -> Option<u64> {
        loop {
            let (due_ms, handle) = match self.heap.peek() {
                Some(Reverse(top)) => (top.due_ms, top.handle),
                None => return None,
            };
            let live = self
                .timers
                .get(&handle)
                .map(|state| !state.cancelled.get())
                .unwrap_or(false);
            if live {
                return Some(due_ms);
            }
            self.heap.pop();
            self.timers.remove(&handle);
        }
    }

    /// Returns true while any timer is armed.
    pub fn has_armed(&self) -> bool {
        !self.timers.is_empty()
    }

    /// Number of currently armed timers.
    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    /// Returns true if the handle refers to a still-armed timer.
    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("armed", &self.timers.len())
            .field("min_delay_ms", &self.min_delay_ms)
            .finish_non_exhaustive()
    }
}
