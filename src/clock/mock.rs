// src/clock/mock.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::Clock;

#[derive(Debug)]
struct ManualState {
    origin: Instant,
    elapsed: Duration,
    idle_waits: Vec<Duration>,
}

/// Simulated clock: `sleep_until` jumps straight to the deadline.
///
/// Clones share the same timeline, so a test can keep one handle while the
/// engine owns another, and hooks can `advance` it to simulate slow work.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                idle_waits: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulated time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Simulated time of `instant`, relative to the clock's origin.
    pub fn offset_of(&self, instant: Instant) -> Duration {
        instant.saturating_duration_since(self.lock().origin)
    }

    pub fn advance(&self, by: Duration) {
        self.lock().elapsed += by;
    }

    /// Every wait the scheduler performed, in order.
    pub fn idle_waits(&self) -> Vec<Duration> {
        self.lock().idle_waits.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let state = self.lock();
        state.origin + state.elapsed
    }

    fn sleep_until(&self, deadline: Instant) {
        let mut state = self.lock();
        let now = state.origin + state.elapsed;
        if deadline > now {
            state.idle_waits.push(deadline - now);
            state.elapsed = deadline - state.origin;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeping_jumps_to_deadline_and_records_wait() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep_until(start + Duration::from_secs(5));

        assert_eq!(clock.elapsed(), Duration::from_secs(5));
        assert_eq!(clock.idle_waits(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn sleeping_into_the_past_is_a_no_op() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(3));

        clock.sleep_until(start + Duration::from_secs(1));

        assert_eq!(clock.elapsed(), Duration::from_secs(3));
        assert!(clock.idle_waits().is_empty());
    }

    #[test]
    fn clones_share_a_timeline() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.advance(Duration::from_millis(250));
        assert_eq!(clock.offset_of(clock.now()), Duration::from_millis(250));
    }
}
