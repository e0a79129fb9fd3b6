//! The cooperative round clock (spec.md §9 design note: "plain loop instead
//! of a protothread macro").
//!
//! [`BootstrapDriver::run`](crate::bootstrap::BootstrapDriver::run) is
//! written against this trait rather than against `std::thread::sleep`
//! directly, so the bootstrap loop's round-by-round structure can be
//! exercised in tests with a clock that advances instantly instead of
//! wall-clock time.

use std::time::{Duration, Instant};

/// Supplies "wait for the rest of this round" to the bootstrap driver.
pub trait RoundClock {
    /// Block (or, in a test clock, simply advance) until `round_duration`
    /// has elapsed since this call began. Returns the new elapsed-time
    /// reading in milliseconds since the clock was created.
    fn sleep_until_round_elapsed(&mut self, round_duration: Duration) -> u64;
}

/// A real clock: sleeps the calling thread, backed by [`Instant`].
pub struct SystemRoundClock {
    started: Instant,
}

impl Default for SystemRoundClock {
    fn default() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl SystemRoundClock {
    /// Start a new clock reading "now" as time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoundClock for SystemRoundClock {
    fn sleep_until_round_elapsed(&mut self, round_duration: Duration) -> u64 {
        std::thread::sleep(round_duration);
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A test clock that advances a counter by exactly `round_duration` per
/// call, with no real waiting.
#[derive(Debug, Default)]
pub struct ManualRoundClock {
    elapsed_ms: u64,
}

impl ManualRoundClock {
    /// Start a manual clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoundClock for ManualRoundClock {
    fn sleep_until_round_elapsed(&mut self, round_duration: Duration) -> u64 {
        self.elapsed_ms += u64::try_from(round_duration.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_by_exactly_the_round_duration() {
        let mut clock = ManualRoundClock::new();
        assert_eq!(clock.sleep_until_round_elapsed(Duration::from_millis(7)), 7);
        assert_eq!(clock.sleep_until_round_elapsed(Duration::from_millis(3)), 10);
    }
}
