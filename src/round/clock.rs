//! Round countdown and the time source behind it.

use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time plus a way to wait. Swapped for a manual source in tests.
pub trait TimeSource {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);
}

/// Wall-clock time source backed by `Instant`.
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}

/// The single authority on how much guessing time is left.
///
/// Created at the moment playback is acknowledged, so device start latency
/// never eats into the answer window.
pub struct RoundClock<'a> {
    time: &'a dyn TimeSource,
    started: Duration,
    limit: Duration,
}

impl<'a> RoundClock<'a> {
    pub fn start(time: &'a dyn TimeSource, limit: Duration) -> Self {
        Self {
            time,
            started: time.now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.time.now().saturating_sub(self.started)
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Wait one tick, or less when expiry comes sooner.
    pub fn wait_tick(&self, tick: Duration) {
        let wait = tick.min(self.remaining());
        if !wait.is_zero() {
            self.time.sleep(wait);
        }
    }
}
