//! A deterministic clock for constructing session fixtures without sleeping real time.

use std::time::Duration;

use otpgate_types::session::Timestamp;
use parking_lot::Mutex;

/// A monotonically-advancing clock a test drives by hand.
///
/// Starts at an arbitrary fixed instant (the Unix epoch plus one day, so arithmetic never
/// underflows) rather than [`Timestamp::now`], so two test runs produce identical timestamps.
pub struct FakeClock {
    current: Mutex<Timestamp>,
}

impl FakeClock {
    /// Builds a clock starting at a fixed instant.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Timestamp::from_millis_since_epoch(
                Duration::from_secs(24 * 60 * 60).as_millis() as u64,
            )),
        }
    }

    /// Returns the current fake time.
    pub fn now(&self) -> Timestamp {
        *self.current.lock()
    }

    /// Advances the clock by `duration` and returns the new current time.
    pub fn advance(&self, duration: Duration) -> Timestamp {
        let mut current = self.current.lock();
        *current = current.plus(duration);
        *current
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_time_forward_by_exactly_the_given_duration() {
        let clock = FakeClock::new();
        let before = clock.now();
        let after = clock.advance(Duration::from_secs(60));
        assert_eq!(after.saturating_duration_since(before), Duration::from_secs(60));
    }

    #[test]
    fn now_is_stable_without_advancing() {
        let clock = FakeClock::new();
        assert_eq!(clock.now(), clock.now());
    }
}
