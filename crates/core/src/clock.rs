//! Clock abstraction and phase duration arithmetic.
//!
//! Elapsed time is always derived from the stored timestamps; nothing here
//! ticks. A live display just calls [`elapsed_seconds`] again with a newer `now`.

use std::sync::Mutex;

use crate::Time;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Time;
}

/// Wall clock backed by `chrono::Utc::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        chrono::Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Time>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Time) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Move the clock forward (or backward, for negative values) by `seconds`.
    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::seconds(seconds);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, at: Time) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Seconds a phase has been actively running.
///
/// The reference point is `end` if set, else `pause` if set, else `now`.
/// Accumulated pause time is subtracted and the result is clamped at zero,
/// so skewed or inconsistent timestamps never produce a negative duration.
pub fn elapsed_seconds(
    start: Option<Time>,
    pause: Option<Time>,
    end: Option<Time>,
    paused_duration: u64,
    now: Time,
) -> u64 {
    let Some(start) = start else {
        return 0;
    };
    let reference = end.or(pause).unwrap_or(now);
    let paused = i64::try_from(paused_duration).unwrap_or(i64::MAX);
    let elapsed = (reference - start).num_seconds().saturating_sub(paused);
    elapsed.max(0) as u64
}

/// Length of a pause that began at `paused_at` and ends at `now`, in seconds.
pub fn pause_span_seconds(paused_at: Time, now: Time) -> u64 {
    (now - paused_at).num_seconds().max(0) as u64
}
