//! Scheduling and loop-driving error types.
//!
//! These are the fail-fast API errors of the runtime itself, distinct from
//! [`core_types::RuntimeError`], which represents failures raised *inside*
//! user callbacks.

use thiserror::Error;

/// Errors reported when a scheduling call is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A recurring timer was requested with a zero interval.
    #[error("interval must be greater than zero")]
    InvalidInterval,
}

/// Errors reported by the loop-driving entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoopError {
    /// The microtask queue failed to reach a fixed point within the
    /// configured safety limit; some callback keeps re-enqueuing work.
    #[error("microtask queue failed to drain within {limit} runs")]
    MicrotaskStarvation {
        /// The configured drain limit that was exceeded.
        limit: usize,
    },
}
