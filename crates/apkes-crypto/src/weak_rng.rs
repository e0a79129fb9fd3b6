//! Jitter source: a cheap, non-cryptographic PRNG.
//!
//! Jitter only needs to de-synchronize HELLOACK responders that all just
//! heard the same HELLO; it carries no security property, so unlike
//! [`crate::random`] it is not seeded or reseeded from the CSPRNG on every
//! call. A single xorshift64* generator, seeded once from the CSPRNG at
//! construction, is adequate and cheap enough to run on a constrained MCU.

/// A weak (non-cryptographic) PRNG used only for staggering HELLOACKs.
#[derive(Debug, Clone)]
pub struct WeakRng {
    state: u64,
}

impl WeakRng {
    /// Seed the generator. `seed` must be non-zero; a zero seed is nudged to
    /// a fixed non-zero value since xorshift is fixed-point at zero.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    /// Seed from the OS CSPRNG.
    pub fn from_entropy() -> Result<Self, crate::CryptoError> {
        let mut buf = [0u8; 8];
        crate::random::fill_random(&mut buf)?;
        Ok(Self::new(u64::from_le_bytes(buf)))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Draw a uniform integer in `[0, bound]` (inclusive).
    ///
    /// `bound == 0` always returns `0`.
    pub fn uniform(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.next_u64() % (bound + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_respects_bound() {
        let mut rng = WeakRng::new(12345);
        for _ in 0..1000 {
            let v = rng.uniform(5);
            assert!(v <= 5);
        }
    }

    #[test]
    fn uniform_zero_bound_is_always_zero() {
        let mut rng = WeakRng::new(1);
        assert_eq!(rng.uniform(0), 0);
    }

    #[test]
    fn zero_seed_does_not_stick_at_zero() {
        let mut rng = WeakRng::new(0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn sequence_is_deterministic_for_a_given_seed() {
        let mut a = WeakRng::new(42);
        let mut b = WeakRng::new(42);
        for _ in 0..20 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }
}
