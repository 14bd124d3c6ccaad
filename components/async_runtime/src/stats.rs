//! Loop introspection.
//!
//! A serializable snapshot of the loop's counters and queue depths, meant
//! for an embedding host's devtools or test assertions.

use serde::{Deserialize, Serialize};

/// Snapshot of event-loop activity.
///
/// Counters are cumulative since the loop was created; depths describe the
/// moment the snapshot was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStats {
    /// Loop iterations driven so far.
    pub ticks: u64,
    /// Macrotasks executed (timer firings and posted events).
    pub macrotasks_run: u64,
    /// Microtasks executed.
    pub microtasks_run: u64,
    /// Frame callbacks executed.
    pub frame_callbacks_run: u64,
    /// Callback errors routed to the error hook.
    pub callback_errors: u64,
    /// Rejections reported through the unhandled-rejection hook.
    pub unhandled_rejections: u64,
    /// Timers currently armed.
    pub timers_armed: usize,
    /// Macrotasks currently queued.
    pub macrotasks_queued: usize,
    /// Microtasks currently queued.
    pub microtasks_queued: usize,
    /// Frame callbacks currently registered.
    pub frames_queued: usize,
    /// Loop clock reading at snapshot time.
    pub now_ms: u64,
}
