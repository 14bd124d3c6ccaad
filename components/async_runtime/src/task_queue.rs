//! Macrotask and microtask queue management.
//!
//! This module provides the two FIFO queues the event loop draws from.
//! Macrotasks are executed one at a time, with all microtasks draining after
//! each macrotask.

use crate::task::{Microtask, Task};
use std::collections::VecDeque;

/// A queue for macrotasks.
///
/// Macrotasks are processed in FIFO order, at most one per loop iteration.
/// The queue is fed by externally posted events; due timers are dispatched
/// ahead of it by the loop.
#[derive(Debug, Default)]
pub struct MacrotaskQueue {
    queue: VecDeque<Task>,
}

impl MacrotaskQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the next task from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A queue for microtasks.
///
/// Drained completely after each macrotask: callbacks enqueued by running
/// microtasks are themselves executed before the drain returns.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<Microtask>,
}

impl MicrotaskQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: Microtask) {
        self.queue.push_back(microtask);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<Microtask> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued microtasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
