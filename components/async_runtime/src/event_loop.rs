//! Event loop implementation.
//!
//! This module provides the scheduler that coordinates every other
//! component. Each iteration (turn) of the loop:
//! 1. Dispatches at most one macrotask, preferring a due timer over
//!    externally posted events
//! 2. Drains the microtask queue to exhaustion
//! 3. Sweeps for unhandled promise rejections
//! 4. Runs the coalesced frame-callback batch when a frame boundary was
//!    crossed
//!
//! There is no ambient global loop: an [`EventLoop`] is an explicit,
//! cloneable handle passed to everything that schedules work. Clones share
//! one loop.
//!
//! # Examples
//!
//! ```
//! use async_runtime::EventLoop;
//! use core_types::Value;
//!
//! let event_loop = EventLoop::new();
//! event_loop.schedule_timeout(|| Ok(Value::Undefined), 10);
//! event_loop.run_until_idle().unwrap();
//! assert_eq!(event_loop.now_ms(), 10);
//! ```

use crate::call_stack::CallStackTracker;
use crate::clock::Clock;
use crate::error::{LoopError, ScheduleError};
use crate::frame::{FrameHandle, FrameScheduler};
use crate::promise::Promise;
use crate::stats::LoopStats;
use crate::task::{Microtask, Task, TaskIdAllocator};
use crate::task_queue::{MacrotaskQueue, MicrotaskQueue};
use crate::timer::{TimerHandle, TimerManager};
use core_types::{RuntimeError, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Hook receiving errors raised by directly scheduled callbacks.
///
/// Arguments are the failing task's label and the error. Reaction-callback
/// errors never arrive here; they reject the reaction's child promise.
pub type ErrorHook = Box<dyn FnMut(&str, &RuntimeError)>;

/// Hook receiving promises whose rejection no reaction picked up by the end
/// of a full microtask drain.
pub type RejectionHook = Box<dyn FnMut(&Promise, &RuntimeError)>;

/// Configuration of an event loop.
#[derive(Debug, Clone)]
pub struct EventLoopConfig {
    /// Enforced floor applied to every timer delay and interval,
    /// emulating host clamping. Default 0 (no clamping).
    pub min_delay_ms: u64,
    /// Optional cap on microtasks run per drain; exceeding it surfaces
    /// [`LoopError::MicrotaskStarvation`]. Default none.
    pub microtask_limit: Option<usize>,
    /// Spacing of frame boundaries on the loop clock. Default 16 ms.
    pub frame_interval_ms: u64,
    /// Use real elapsed time instead of the manual virtual clock.
    /// Default false; tests and deterministic hosts drive time explicitly.
    pub wall_clock: bool,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 0,
            microtask_limit: None,
            frame_interval_ms: 16,
            wall_clock: false,
        }
    }
}

struct Hooks {
    error: RefCell<Option<ErrorHook>>,
    rejection: RefCell<Option<RejectionHook>>,
}

struct LoopInner {
    clock: Clock,
    stack: CallStackTracker,
    timers: TimerManager,
    macrotasks: MacrotaskQueue,
    microtasks: MicrotaskQueue,
    frames: FrameScheduler,
    ids: TaskIdAllocator,
    config: EventLoopConfig,
    pending_rejections: Vec<Promise>,
    next_frame_at: u64,
    in_callback: bool,
    counters: LoopStats,
}

enum TaskKind {
    Macrotask,
    FrameCallback,
}

/// The event loop.
///
/// A cheap, cloneable handle; all clones drive the same loop. Methods take
/// `&self` so callbacks running inside the loop can schedule further work
/// through their own captured handle.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<RefCell<LoopInner>>,
    hooks: Rc<Hooks>,
}

impl EventLoop {
    /// Creates a loop with the default configuration (manual clock).
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Creates a loop with the given configuration.
    pub fn with_config(config: EventLoopConfig) -> Self {
        let ids = TaskIdAllocator::new();
        let clock = if config.wall_clock {
            Clock::monotonic()
        } else {
            Clock::manual()
        };
        let inner = LoopInner {
            clock,
            stack: CallStackTracker::new(),
            timers: TimerManager::new(ids.clone(), config.min_delay_ms),
            macrotasks: MacrotaskQueue::new(),
            microtasks: MicrotaskQueue::new(),
            frames: FrameScheduler::new(ids.clone()),
            ids,
            config,
            pending_rejections: Vec::new(),
            next_frame_at: 0,
            in_callback: false,
            counters: LoopStats::default(),
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
            hooks: Rc::new(Hooks {
                error: RefCell::new(None),
                rejection: RefCell::new(None),
            }),
        }
    }

    /// Current loop-clock reading in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().clock.now_ms()
    }

    // ------------------------------------------------------------------
    // Scheduling surface
    // ------------------------------------------------------------------

    /// Schedules a one-shot timer callback due after `delay_ms`.
    pub fn schedule_timeout<F>(&self, callback: F, delay_ms: u64) -> TimerHandle
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let now = inner.clock.now_ms();
        inner.timers.schedule_once(callback, delay_ms, now)
    }

    /// Schedules a recurring timer callback firing every `interval_ms`.
    ///
    /// Fails fast with [`ScheduleError::InvalidInterval`] for a zero
    /// interval. The first firing is due one interval from now.
    pub fn schedule_interval<F>(
        &self,
        callback: F,
        interval_ms: u64,
    ) -> Result<TimerHandle, ScheduleError>
    where
        F: FnMut() -> Result<Value, RuntimeError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let now = inner.clock.now_ms();
        inner.timers.schedule_recurring(callback, interval_ms, now)
    }

    /// Cancels a timer. Idempotent; never an error.
    pub fn clear_timer(&self, handle: TimerHandle) {
        self.inner.borrow_mut().timers.cancel(handle);
    }

    /// Enqueues a microtask.
    pub fn schedule_microtask<F>(&self, callback: F)
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.ids.next_id();
        let label = format!("microtask#{}", id);
        inner.microtasks.enqueue(Microtask::new(id, label, callback));
    }

    /// Enqueues a promise-reaction microtask.
    pub(crate) fn enqueue_reaction<F>(&self, callback: F)
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.ids.next_id();
        let label = format!("reaction#{}", id);
        inner.microtasks.enqueue(Microtask::new(id, label, callback));
    }

    /// Posts an external-event callback as a macrotask.
    ///
    /// This is the injection interface a host's timer/I-O facility uses to
    /// report completions.
    pub fn post_event<F>(&self, callback: F)
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.ids.next_id();
        let label = format!("event#{}", id);
        inner.macrotasks.enqueue(Task::new(id, label, callback));
    }

    /// Registers a single-shot frame callback for the next frame boundary.
    pub fn request_frame<F>(&self, callback: F) -> FrameHandle
    where
        F: FnOnce() -> Result<Value, RuntimeError> + 'static,
    {
        self.inner.borrow_mut().frames.request_frame(callback)
    }

    /// Cancels a frame callback. Idempotent; never an error.
    pub fn cancel_frame(&self, handle: FrameHandle) {
        self.inner.borrow_mut().frames.cancel_frame(handle);
    }

    /// Toggles frame firing; `false` models a backgrounded host.
    pub fn set_frames_active(&self, active: bool) {
        self.inner.borrow_mut().frames.set_active(active);
    }

    /// Reports whether frame callbacks currently fire.
    pub fn frames_active(&self) -> bool {
        self.inner.borrow().frames.is_active()
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Installs the hook receiving user-callback errors.
    ///
    /// Without a hook, errors are written to stderr.
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: FnMut(&str, &RuntimeError) + 'static,
    {
        *self.hooks.error.borrow_mut() = Some(Box::new(hook));
    }

    /// Installs the hook receiving unhandled promise rejections.
    ///
    /// Without a hook, rejections are written to stderr.
    pub fn set_rejection_hook<F>(&self, hook: F)
    where
        F: FnMut(&Promise, &RuntimeError) + 'static,
    {
        *self.hooks.rejection.borrow_mut() = Some(Box::new(hook));
    }

    pub(crate) fn track_rejection(&self, promise: Promise) {
        self.inner.borrow_mut().pending_rejections.push(promise);
    }

    fn report_error(&self, label: &str, error: &RuntimeError) {
        self.inner.borrow_mut().counters.callback_errors += 1;
        let hook = self.hooks.error.borrow_mut().take();
        match hook {
            Some(mut hook) => {
                hook(label, error);
                let mut slot = self.hooks.error.borrow_mut();
                if slot.is_none() {
                    *slot = Some(hook);
                }
            }
            None => eprintln!("uncaught error in {}: {}", label, error),
        }
    }

    fn report_rejection(&self, promise: &Promise, reason: &RuntimeError) {
        self.inner.borrow_mut().counters.unhandled_rejections += 1;
        let hook = self.hooks.rejection.borrow_mut().take();
        match hook {
            Some(mut hook) => {
                hook(promise, reason);
                let mut slot = self.hooks.rejection.borrow_mut();
                if slot.is_none() {
                    *slot = Some(hook);
                }
            }
            None => eprintln!("unhandled rejection: {}", reason),
        }
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    fn run_task(&self, task: Task, kind: TaskKind) {
        if task.is_cancelled() {
            return;
        }
        let label = task.label().to_string();
        {
            let mut inner = self.inner.borrow_mut();
            inner.stack.enter(label.clone());
            inner.in_callback = true;
            match kind {
                TaskKind::Macrotask => inner.counters.macrotasks_run += 1,
                TaskKind::FrameCallback => inner.counters.frame_callbacks_run += 1,
            }
        }
        let result = task.run();
        {
            let mut inner = self.inner.borrow_mut();
            inner.in_callback = false;
            inner.stack.leave();
        }
        if let Err(error) = result {
            self.report_error(&label, &error);
        }
    }

    fn run_microtask(&self, microtask: Microtask) {
        let label = microtask.label().to_string();
        {
            let mut inner = self.inner.borrow_mut();
            inner.stack.enter(label.clone());
            inner.in_callback = true;
            inner.counters.microtasks_run += 1;
        }
        let result = microtask.run();
        {
            let mut inner = self.inner.borrow_mut();
            inner.in_callback = false;
            inner.stack.leave();
        }
        if let Err(error) = result {
            self.report_error(&label, &error);
        }
    }

    /// Runs every queued microtask, including ones enqueued by the drain
    /// itself, until the queue reaches a fixed point.
    fn drain_microtasks(&self) -> Result<(), LoopError> {
        let limit = self.inner.borrow().config.microtask_limit;
        let mut ran: usize = 0;
        loop {
            if self.inner.borrow().microtasks.is_empty() {
                return Ok(());
            }
            if let Some(limit) = limit {
                if ran >= limit {
                    return Err(LoopError::MicrotaskStarvation { limit });
                }
            }
            let next = self.inner.borrow_mut().microtasks.dequeue();
            if let Some(microtask) = next {
                self.run_microtask(microtask);
                ran += 1;
            }
        }
    }

    /// Reports promises still rejected-and-unhandled now that a full
    /// microtask drain has completed.
    fn sweep_rejections(&self) {
        let pending = std::mem::take(&mut self.inner.borrow_mut().pending_rejections);
        for promise in pending {
            if let Some(reason) = promise.take_unreported_rejection() {
                self.report_rejection(&promise, &reason);
            }
        }
    }

    /// Executes the user's top-level synchronous code as one turn.
    ///
    /// The callback runs immediately inside a call-stack frame; when it
    /// returns, queued microtasks drain to exhaustion and unhandled
    /// rejections are swept, exactly as after a macrotask.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a running callback.
    pub fn run_main<F>(&self, label: &str, callback: F) -> Result<(), LoopError>
    where
        F: FnOnce() -> Result<Value, RuntimeError>,
    {
        {
            let mut inner = self.inner.borrow_mut();
            assert!(
                !inner.in_callback,
                "run_main called from inside a running callback"
            );
            inner.stack.enter(label);
            inner.in_callback = true;
        }
        let result = callback();
        {
            let mut inner = self.inner.borrow_mut();
            inner.in_callback = false;
            inner.stack.leave();
        }
        if let Err(error) = result {
            self.report_error(label, &error);
        }
        self.drain_microtasks()?;
        self.sweep_rejections();
        Ok(())
    }

    /// Advances the clock to `now_ms` and runs one full loop iteration.
    ///
    /// This is the deterministic driving primitive: one macrotask (a due
    /// timer if any, otherwise the oldest posted event), a full microtask
    /// drain, a rejection sweep, and the frame batch when a frame boundary
    /// was crossed. Timestamps in the past leave the clock unchanged.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a running callback; the loop is
    /// already running there.
    pub fn tick(&self, now_ms: u64) -> Result<(), LoopError> {
        let task = {
            let mut inner = self.inner.borrow_mut();
            assert!(
                !inner.in_callback,
                "tick called from inside a running callback"
            );
            inner.clock.advance_to(now_ms);
            inner.counters.ticks += 1;
            let now = inner.clock.now_ms();
            match inner.timers.pop_due(now) {
                Some(task) => Some(task),
                None => inner.macrotasks.dequeue(),
            }
        };
        if let Some(task) = task {
            self.run_task(task, TaskKind::Macrotask);
        }
        self.drain_microtasks()?;
        self.sweep_rejections();

        let batch = {
            let mut inner = self.inner.borrow_mut();
            let now = inner.clock.now_ms();
            if inner.frames.is_active()
                && inner.frames.has_registrations()
                && now >= inner.next_frame_at
            {
                inner.next_frame_at = now + inner.config.frame_interval_ms;
                inner.frames.take_batch()
            } else {
                Vec::new()
            }
        };
        if !batch.is_empty() {
            for task in batch {
                self.run_task(task, TaskKind::FrameCallback);
            }
            self.drain_microtasks()?;
            self.sweep_rejections();
        }
        Ok(())
    }

    /// Returns true while any queued work remains: queued macro- or
    /// microtasks, armed timers, or frame registrations with frames active.
    pub fn has_pending_work(&self) -> bool {
        let inner = self.inner.borrow();
        !inner.microtasks.is_empty()
            || !inner.macrotasks.is_empty()
            || !inner.pending_rejections.is_empty()
            || inner.timers.has_armed()
            || (inner.frames.is_active() && inner.frames.has_registrations())
    }

    /// Earliest timestamp at which the loop has something to do.
    fn next_work_time(&self) -> Option<u64> {
        let mut inner = self.inner.borrow_mut();
        let now = inner.clock.now_ms();
        if !inner.microtasks.is_empty()
            || !inner.macrotasks.is_empty()
            || !inner.pending_rejections.is_empty()
        {
            return Some(now);
        }
        let mut next: Option<u64> = None;
        if let Some(due) = inner.timers.next_due_ms() {
            next = Some(due.max(now));
        }
        if inner.frames.is_active() && inner.frames.has_registrations() {
            let frame_at = inner.next_frame_at.max(now);
            next = Some(match next {
                Some(at) => at.min(frame_at),
                None => frame_at,
            });
        }
        next
    }

    /// Ticks until no queued work remains, jumping the manual clock straight
    /// to each next relevant timestamp.
    ///
    /// Intended for the manual clock: with `wall_clock` the loop instead
    /// spins ticks until real time catches up with pending timers. A
    /// recurring timer keeps the loop alive until it is cancelled, as does a
    /// frame callback that re-requests itself every frame.
    pub fn run_until_idle(&self) -> Result<(), LoopError> {
        while let Some(at) = self.next_work_time() {
            self.tick(at)?;
        }
        Ok(())
    }

    /// Takes a snapshot of loop counters and queue depths.
    pub fn stats(&self) -> LoopStats {
        let inner = self.inner.borrow();
        let mut stats = inner.counters.clone();
        stats.timers_armed = inner.timers.armed_count();
        stats.macrotasks_queued = inner.macrotasks.len();
        stats.microtasks_queued = inner.microtasks.len();
        stats.frames_queued = inner.frames.pending_count();
        stats.now_ms = inner.clock.now_ms();
        stats
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventLoop")
            .field("now_ms", &inner.clock.now_ms())
            .field("timers_armed", &inner.timers.armed_count())
            .field("macrotasks_queued", &inner.macrotasks.len())
            .field("microtasks_queued", &inner.microtasks.len())
            .finish_non_exhaustive()
    }
}
