//! Constant-time comparisons for challenges and derived keys.
//!
//! Timing-safe equality matters here specifically for the HELLOACK
//! challenge check (`payload[0..L] == our_challenge`, spec.md §4.4 step 4),
//! which is the reflection-attack defense: an attacker probing with guessed
//! challenge bytes must not learn anything from how long the comparison
//! takes.

use subtle::ConstantTimeEq;

/// Constant-time comparison of byte slices.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Timing-safe comparison of two challenges.
#[must_use]
pub fn verify_challenge(a: &[u8; crate::CHALLENGE_LEN], b: &[u8; crate::CHALLENGE_LEN]) -> bool {
    ct_eq(a, b)
}
