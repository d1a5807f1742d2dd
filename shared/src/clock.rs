//! Wall-clock source for tick budgets and connection timeouts.
//!
//! The server never calls `Instant::now()` directly so tests can drive time
//! with a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// With a non-zero step every call to `now()` also advances the clock by
/// that step, which lets tests simulate work that takes time.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
    step_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
            step_nanos: AtomicU64::new(0),
        }
    }

    pub fn with_step(step: Duration) -> Self {
        let clock = Self::new();
        clock.set_step(step);
        clock
    }

    pub fn advance(&self, by: Duration) {
        self.offset_nanos
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set_step(&self, step: Duration) {
        self.step_nanos
            .store(step.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let step = self.step_nanos.load(Ordering::SeqCst);
        let offset = self.offset_nanos.fetch_add(step, Ordering::SeqCst);
        self.origin + Duration::from_nanos(offset)
    }
}
