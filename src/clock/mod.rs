// src/clock/mod.rs

//! Time source used by the scheduler's retry wait.
//!
//! The scheduler never calls `Instant::now()` or `thread::sleep` directly;
//! it goes through a [`Clock`] so tests can drive retries with simulated
//! time ([`mock::ManualClock`]).

use std::fmt::Debug;
use std::time::Instant;

pub mod mock;

pub use mock::ManualClock;

/// Abstract clock interface.
pub trait Clock: Send + Debug {
    fn now(&self) -> Instant;

    /// Block until `deadline` has passed. Returns immediately if it already has.
    fn sleep_until(&self, deadline: Instant);
}

/// Implementation backed by the OS monotonic clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}
