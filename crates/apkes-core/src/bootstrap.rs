//! The bootstrap driver (spec.md §4.1, §8 scenario 5): broadcasts a fixed
//! number of HELLO rounds, spaced `round_duration` apart, then reports
//! bootstrap complete exactly once.
//!
//! Mirrors the original's `PROCESS_THREAD` loop, but expressed as a
//! `tick`-driven state machine rather than a blocking coroutine, so it
//! composes with the cooperative, non-blocking style the rest of this
//! crate uses (spec.md §5): nothing here sleeps or owns a thread.

use apkes_link::LinkSecurityModule;

use crate::clock::RoundClock;
use crate::config::ApkesConfig;
use crate::engine::HandshakeEngine;
use crate::neighbor::NeighborTable;
use crate::scheme::SchemeProvider;

/// Drives the fixed-round HELLO broadcast bootstrap phase for one node.
pub struct BootstrapDriver {
    total_rounds: u8,
    rounds_sent: u8,
    round_duration_ms: u64,
    next_round_at_ms: u64,
    bootstrapped: bool,
}

impl BootstrapDriver {
    /// Start a new bootstrap sequence. `start_ms` is the clock reading at
    /// which the first round should fire (typically "now").
    #[must_use]
    pub fn new(config: &ApkesConfig, start_ms: u64) -> Self {
        Self {
            total_rounds: config.rounds,
            rounds_sent: 0,
            round_duration_ms: u64::try_from(config.round_duration.as_millis())
                .unwrap_or(u64::MAX),
            next_round_at_ms: start_ms,
            bootstrapped: false,
        }
    }

    /// Whether all configured rounds have been sent. Mirrors the original
    /// `is_bootstrapped` query: once this flips to `true` it never reverts
    /// (`bootstrap()` is meant to run once per node lifetime — spec.md §9).
    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Number of HELLO rounds sent so far.
    #[must_use]
    pub fn rounds_sent(&self) -> u8 {
        self.rounds_sent
    }

    /// Advance the bootstrap state machine. Call periodically (e.g. once
    /// per node main-loop cycle) with the current clock reading; broadcasts
    /// a HELLO at the start of each due round via `engine` and flips
    /// [`BootstrapDriver::is_bootstrapped`] once every round has fired.
    pub fn tick<L, T, S, const N: usize>(
        &mut self,
        engine: &mut HandshakeEngine<L, T, S, N>,
        now_ms: u64,
    ) where
        L: LinkSecurityModule,
        T: NeighborTable,
        S: SchemeProvider,
    {
        if self.bootstrapped || now_ms < self.next_round_at_ms {
            return;
        }
        if self.rounds_sent >= self.total_rounds {
            self.bootstrapped = true;
            tracing::info!(rounds = self.total_rounds, "bootstrap complete");
            return;
        }
        if let Err(err) = engine.broadcast_hello() {
            tracing::warn!(%err, "failed to broadcast HELLO during bootstrap");
        }
        self.rounds_sent += 1;
        self.next_round_at_ms = now_ms + self.round_duration_ms;
    }

    /// Run the whole bootstrap sequence to completion as a plain blocking
    /// loop, driven by `clock` rather than an async runtime or a
    /// protothread macro (spec.md §9 design note): broadcast, wait out the
    /// round, repeat, for exactly `config.rounds` rounds.
    pub fn run<L, T, S, const N: usize>(
        config: &ApkesConfig,
        engine: &mut HandshakeEngine<L, T, S, N>,
        clock: &mut impl RoundClock,
    ) where
        L: LinkSecurityModule,
        T: NeighborTable,
        S: SchemeProvider,
    {
        for round in 1..=config.rounds {
            if let Err(err) = engine.broadcast_hello() {
                tracing::warn!(%err, round, "failed to broadcast HELLO during bootstrap");
            }
            if round < config.rounds {
                clock.sleep_until_round_elapsed(config.round_duration);
            }
        }
        tracing::info!(rounds = config.rounds, "bootstrap complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualRoundClock;
    use crate::neighbor::ArrayNeighborTable;
    use crate::scheme::PreSharedNetworkSecret;
    use apkes_crypto::{PAIRWISE_KEY_LEN, WeakRng};
    use apkes_link::software::{Medium, SoftwareLinkSecurity};

    fn engine_for(
        addr: u64,
        medium: &Medium,
    ) -> HandshakeEngine<SoftwareLinkSecurity, ArrayNeighborTable<2>, PreSharedNetworkSecret, 2>
    {
        let link = SoftwareLinkSecurity::new(addr, medium.clone());
        let table = ArrayNeighborTable::new();
        let scheme = PreSharedNetworkSecret::new([0x11u8; PAIRWISE_KEY_LEN]);
        HandshakeEngine::new(
            link,
            table,
            scheme,
            ApkesConfig {
                max_tentative_neighbors: 2,
                ..ApkesConfig::default()
            },
            addr,
            addr as u16,
            WeakRng::new(addr),
        )
    }

    #[test]
    fn sends_exactly_configured_rounds_then_stops() {
        let medium = Medium::new();
        let mut a = engine_for(1, &medium);
        let b_link = SoftwareLinkSecurity::new(2, medium.clone());

        let config = ApkesConfig {
            rounds: 3,
            round_duration: std::time::Duration::from_millis(100),
            max_tentative_neighbors: 2,
            ..ApkesConfig::default()
        };
        let mut driver = BootstrapDriver::new(&config, 0);

        let mut t = 0u64;
        for _ in 0..10 {
            driver.tick(&mut a, t);
            t += 100;
        }

        assert!(driver.is_bootstrapped());
        assert_eq!(driver.rounds_sent(), 3);

        // Every round's HELLO should have reached the peer.
        let mut received = 0;
        let mut b = b_link;
        while b.poll().is_some() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[test]
    fn does_not_send_before_the_round_is_due() {
        let medium = Medium::new();
        let mut a = engine_for(1, &medium);
        let config = ApkesConfig {
            rounds: 2,
            round_duration: std::time::Duration::from_millis(1_000),
            max_tentative_neighbors: 2,
            ..ApkesConfig::default()
        };
        let mut driver = BootstrapDriver::new(&config, 0);
        driver.tick(&mut a, 0);
        assert_eq!(driver.rounds_sent(), 1);
        driver.tick(&mut a, 500);
        assert_eq!(driver.rounds_sent(), 1);
        driver.tick(&mut a, 1_000);
        assert_eq!(driver.rounds_sent(), 2);
    }

    #[test]
    fn run_broadcasts_exactly_rounds_hellos() {
        let medium = Medium::new();
        let mut a = engine_for(1, &medium);
        let b_link = SoftwareLinkSecurity::new(2, medium.clone());
        let config = ApkesConfig {
            rounds: 4,
            round_duration: std::time::Duration::from_millis(1),
            max_tentative_neighbors: 2,
            ..ApkesConfig::default()
        };
        let mut clock = ManualRoundClock::new();

        BootstrapDriver::run(&config, &mut a, &mut clock);

        let mut b = b_link;
        let mut received = 0;
        while b.poll().is_some() {
            received += 1;
        }
        assert_eq!(received, 4);
    }
}
