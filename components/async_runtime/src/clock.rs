//! Monotonic time source for the event loop.
//!
//! Two modes: a manual clock that advances only when told to (deterministic
//! for tests and host-driven embedding) and a wall clock backed by
//! `std::time::Instant` for production use.

use std::time::Instant;

#[derive(Debug, Clone)]
enum ClockSource {
    /// Virtual milliseconds; moves only via `advance_to`.
    Manual { now_ms: u64 },
    /// Real time elapsed since the clock was created.
    Monotonic { origin: Instant },
}

/// Monotonic millisecond clock.
///
/// The clock never moves backwards: in manual mode, `advance_to` with an
/// earlier timestamp is a no-op.
///
/// # Examples
///
/// ```
/// use async_runtime::Clock;
///
/// let mut clock = Clock::manual();
/// assert_eq!(clock.now_ms(), 0);
/// clock.advance_to(100);
/// clock.advance_to(50); // ignored, time is monotonic
/// assert_eq!(clock.now_ms(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    source: ClockSource,
}

impl Clock {
    /// Creates a manual clock starting at time 0.
    pub fn manual() -> Self {
        Self {
            source: ClockSource::Manual { now_ms: 0 },
        }
    }

    /// Creates a wall clock measuring real elapsed time from now.
    pub fn monotonic() -> Self {
        Self {
            source: ClockSource::Monotonic {
                origin: Instant::now(),
            },
        }
    }

    /// Returns the current time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        match &self.source {
            ClockSource::Manual { now_ms } => *now_ms,
            ClockSource::Monotonic { origin } => origin.elapsed().as_millis() as u64,
        }
    }

    /// Advances a manual clock to the given timestamp.
    ///
    /// Timestamps in the past are ignored. On a wall clock this is a no-op;
    /// real time advances on its own.
    pub fn advance_to(&mut self, timestamp_ms: u64) {
        if let ClockSource::Manual { now_ms } = &mut self.source {
            if timestamp_ms > *now_ms {
                *now_ms = timestamp_ms;
            }
        }
    }

    /// Returns true if this clock only advances via [`Clock::advance_to`].
    pub fn is_manual(&self) -> bool {
        matches!(self.source, ClockSource::Manual { .. })
    }
}
