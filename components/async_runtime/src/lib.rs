//! Cooperative event-loop runtime.
//!
//! This crate provides a single-threaded scheduler that interleaves
//! synchronous execution with deferred callbacks in a precisely ordered way,
//! plus a promise primitive whose continuations it dispatches:
//! - Event loop with macrotask and microtask queues
//! - Virtual or wall-clock time source driving one-shot and recurring timers
//! - Coalesced once-per-frame callback scheduling
//! - Promise state machine with chaining and the `all`/`race`/`all_settled`/
//!   `any` combinators
//!
//! # Overview
//!
//! Every loop iteration runs at most one macrotask (a due timer, else an
//! externally posted event), then drains the microtask queue to exhaustion,
//! then fires the frame batch when a frame boundary was crossed. Nothing
//! here blocks: scheduling calls return immediately after registering a
//! continuation, and the host drives the loop with [`EventLoop::tick`] or
//! [`EventLoop::run_until_idle`].
//!
//! # Examples
//!
//! ## Driving the loop
//!
//! ```
//! use async_runtime::EventLoop;
//! use core_types::Value;
//!
//! let event_loop = EventLoop::new();
//! event_loop.schedule_timeout(|| Ok(Value::Undefined), 25);
//! event_loop.run_until_idle().unwrap();
//! assert_eq!(event_loop.now_ms(), 25);
//! ```
//!
//! ## Promise chaining
//!
//! ```
//! use async_runtime::{EventLoop, Promise, PromiseState};
//! use core_types::Value;
//!
//! let event_loop = EventLoop::new();
//! let promise = Promise::resolved(&event_loop, Value::Smi(41));
//! let next = promise.then(
//!     Some(Box::new(|value| match value {
//!         Value::Smi(n) => Ok(Value::Smi(n + 1)),
//!         other => Ok(other),
//!     })),
//!     None,
//! );
//! event_loop.run_until_idle().unwrap();
//! assert_eq!(next.state(), PromiseState::Fulfilled(Value::Smi(42)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_stack;
pub mod clock;
pub mod combinators;
pub mod error;
pub mod event_loop;
pub mod frame;
pub mod promise;
pub mod stats;
pub mod task;
pub mod task_queue;
pub mod timer;

// Re-export main types at crate root
pub use call_stack::CallStackTracker;
pub use clock::Clock;
pub use combinators::SettledOutcome;
pub use error::{LoopError, ScheduleError};
pub use event_loop::{ErrorHook, EventLoop, EventLoopConfig, RejectionHook};
pub use frame::{FrameHandle, FrameScheduler};
pub use promise::{
    as_promise, is_promise, FulfillHandler, Promise, PromiseState, RejectFn, RejectHandler,
    ResolveFn,
};
pub use stats::LoopStats;
pub use task::{Microtask, Task, TaskCallback, TaskId, TaskIdAllocator};
pub use task_queue::{MacrotaskQueue, MicrotaskQueue};
pub use timer::{TimerHandle, TimerManager};
