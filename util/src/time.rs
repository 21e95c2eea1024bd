//! General time utility functions
//!
//! Time inside the control software is a free running millisecond counter
//! which wraps at `u32::MAX`, the same as a microcontroller tick counter.
//! Durations must only ever be derived with [`elapsed_ms`] so that the wrap is
//! treated as an unsigned difference rather than a negative duration.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// A timestamp in milliseconds on the wrapping control clock.
pub type Millis = u32;

/// Number of milliseconds in a second
pub const MILLIS_PER_SECOND: f64 = 1000.0;

/// Milliseconds elapsed between `then` and `now`, tolerating a single wrap of
/// the counter between the two.
#[inline]
pub fn elapsed_ms(now: Millis, then: Millis) -> Millis {
    now.wrapping_sub(then)
}

/// A source of control clock timestamps.
pub trait Clock: Send + Sync {
    /// Current time on the control clock.
    fn now_ms(&self) -> Millis;
}

/// Clock based on the process monotonic clock, truncated to the wrapping
/// millisecond counter.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
    offset_ms: Millis,
}

/// A clock which only moves when told to. Used by tests and the simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU32,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Create a clock which starts counting from `offset_ms`. Useful to
    /// exercise the counter wrap.
    pub fn with_offset(offset_ms: Millis) -> Self {
        Self {
            start: Instant::now(),
            offset_ms,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        // Truncation is the wrap
        (self.start.elapsed().as_millis() as u32).wrapping_add(self.offset_ms)
    }
}

impl ManualClock {
    pub fn new(start_ms: Millis) -> Self {
        Self {
            now_ms: AtomicU32::new(start_ms),
        }
    }

    /// Move the clock forwards by `dt_ms`, wrapping if required.
    pub fn advance(&self, dt_ms: Millis) -> Millis {
        self.now_ms.fetch_add(dt_ms, Ordering::SeqCst).wrapping_add(dt_ms)
    }

    pub fn set(&self, now_ms: Millis) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now_ms.load(Ordering::SeqCst)
    }
}
