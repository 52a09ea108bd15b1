//! Output rate limiting.
//!
//! A gate rather than a queue: frames arriving inside the interval are
//! dropped, never buffered.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default emission interval (about 10 Hz).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Lets at most one emission through per interval.
///
/// The last emission time sits behind a mutex so the sensor thread and the
/// control thread can share one limiter. The check and the update happen under
/// the same lock.
#[derive(Debug)]
pub struct FrameRateLimiter {
    interval: Duration,
    last_emitted: Mutex<Option<Instant>>,
}

impl FrameRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true, and records `now`, if more than the interval has passed
    /// since the last emission. Otherwise returns false and changes nothing.
    /// The first call always emits.
    pub fn should_emit(&self, now: Instant) -> bool {
        let mut last = self
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(previous) if now.saturating_duration_since(previous) <= self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Forget the last emission; the next call emits.
    pub fn reset(&self) {
        *self
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for FrameRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
