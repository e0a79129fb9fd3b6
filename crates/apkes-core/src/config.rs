//! Build-time-tunable constants (spec.md §6), as runtime configuration
//! fields rather than the original's `#ifdef`s.
//!
//! Modeled on the teacher's `SessionConfig`/`DiscoveryConfig` pattern: a
//! plain `Clone` struct with a `Default` impl, constructed once per node
//! and threaded into [`crate::engine::HandshakeEngine`] and
//! [`crate::bootstrap::BootstrapDriver`].

use std::time::Duration;

/// Runtime configuration for one node's APKES instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkesConfig {
    /// Number of HELLO broadcast rounds the bootstrap driver runs.
    pub rounds: u8,
    /// Duration of one bootstrap round.
    pub round_duration: Duration,
    /// Maximum number of concurrently tentative neighbors (wait-timer pool
    /// capacity); this bound is the HELLO-flood defense.
    pub max_tentative_neighbors: usize,
    /// Upper bound (inclusive) of the jittered delay before sending a
    /// HELLOACK.
    pub max_waiting_period: Duration,
    /// Grace period added to `max_waiting_period` when computing a
    /// tentative neighbor's `expiration_time`.
    pub ack_delay: Duration,
    /// Whether HELLOACK/ACK piggyback an EBEAP broadcast key and encrypt
    /// the HELLOACK payload, rather than sending the sender's short address
    /// in the clear.
    pub encryption_enabled: bool,
}

impl Default for ApkesConfig {
    fn default() -> Self {
        let round_duration = Duration::from_secs(7);
        Self {
            rounds: 6,
            round_duration,
            max_tentative_neighbors: 2,
            max_waiting_period: round_duration.saturating_sub(Duration::from_secs(2)),
            ack_delay: Duration::from_secs(5),
            encryption_enabled: false,
        }
    }
}

impl ApkesConfig {
    /// Total expiration window for a handshake that has just received
    /// HELLO: `max_waiting_period + ack_delay` (spec.md §4.4 step 5).
    #[must_use]
    pub fn handshake_expiration(&self) -> Duration {
        self.max_waiting_period + self.ack_delay
    }
}
