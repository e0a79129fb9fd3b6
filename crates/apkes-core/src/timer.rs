//! The wait-timer pool (spec.md §3 "Design note", §7 "HELLO flood"): a
//! fixed number of slots, one per concurrently tentative neighbor. Its
//! capacity *is* the HELLO-flood defense — once every slot holds a pending
//! HELLOACK, further HELLOs are dropped rather than answered.
//!
//! There is no OS timer wheel here: this is a cooperative, single-threaded
//! model (spec.md §5), so a timer is just a deadline compared against a
//! caller-supplied clock reading on every [`WaitTimerPool::take_expired`]
//! poll. Slots hold a [`NeighborHandle`], never an owning reference to the
//! neighbor itself, so a timer and its neighbor can never alias a mutable
//! borrow.

use apkes_crypto::WeakRng;

use crate::neighbor::NeighborHandle;

/// Handle to a scheduled wait-timer.
pub type TimerId = usize;

struct WaitTimerSlot {
    deadline_ms: u64,
    neighbor: NeighborHandle,
}

/// A fixed-capacity pool of wait-timers, one per concurrently tentative
/// neighbor handshake.
pub struct WaitTimerPool<const N: usize> {
    slots: [Option<WaitTimerSlot>; N],
}

impl<const N: usize> Default for WaitTimerPool<N> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl<const N: usize> WaitTimerPool<N> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `neighbor` to fire at `deadline_ms`. Returns `None` if the
    /// pool is full — the caller must drop the HELLO that would have
    /// created this timer (spec.md §7).
    pub fn schedule(&mut self, neighbor: NeighborHandle, deadline_ms: u64) -> Option<TimerId> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(WaitTimerSlot {
            deadline_ms,
            neighbor,
        });
        Some(idx)
    }

    /// Number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Release every slot whose deadline is at or before `now_ms`, freeing
    /// them unconditionally — the original C frees a wait-timer's slot the
    /// moment it fires, regardless of what `wait_callback` decides to do
    /// with the neighbor.
    pub fn take_expired(&mut self, now_ms: u64) -> Vec<(TimerId, NeighborHandle)> {
        let mut fired = Vec::new();
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if matches!(slot, Some(s) if s.deadline_ms <= now_ms) {
                if let Some(s) = slot.take() {
                    fired.push((idx, s.neighbor));
                }
            }
        }
        fired
    }
}

/// Draw a jittered delay in `[0, max_ms]`, used to stagger HELLOACKs sent
/// in response to a simultaneous HELLO broadcast (spec.md §8 scenario 4)
/// so that two neighbors replying to the same HELLO don't collide on the
/// air. Uses the non-cryptographic PRNG: this delay has no security
/// purpose, only a collision-avoidance one (spec.md §2).
pub fn jittered_delay_ms(rng: &mut WeakRng, max_ms: u64) -> u64 {
    rng.uniform(max_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_rejects_scheduling_past_capacity() {
        let mut pool: WaitTimerPool<2> = WaitTimerPool::new();
        assert!(pool.schedule(0, 100).is_some());
        assert!(pool.schedule(1, 100).is_some());
        assert!(pool.schedule(2, 100).is_none());
    }

    #[test]
    fn expired_timers_free_their_slot() {
        let mut pool: WaitTimerPool<1> = WaitTimerPool::new();
        pool.schedule(0, 50).unwrap();
        assert_eq!(pool.available(), 0);
        let fired = pool.take_expired(100);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, 0);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn timers_not_yet_due_stay_scheduled() {
        let mut pool: WaitTimerPool<1> = WaitTimerPool::new();
        pool.schedule(0, 500).unwrap();
        assert!(pool.take_expired(100).is_empty());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn jittered_delay_never_exceeds_the_bound() {
        let mut rng = WeakRng::new(12345);
        for _ in 0..100 {
            assert!(jittered_delay_ms(&mut rng, 5_000) <= 5_000);
        }
    }

    #[test]
    fn zero_max_delay_is_always_zero() {
        let mut rng = WeakRng::new(1);
        assert_eq!(jittered_delay_ms(&mut rng, 0), 0);
    }
}
