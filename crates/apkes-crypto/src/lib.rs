//! # APKES Crypto
//!
//! Nonce generation and pairwise-key derivation primitives for the
//! Adaptable Pairwise Key Establishment Scheme.
//!
//! This crate deliberately does *not* implement AEAD frame encryption —
//! that belongs to the link-layer security module (see `apkes-link`), which
//! the handshake engine treats as an external collaborator. What lives here
//! is the small set of primitives the handshake performs directly:
//!
//! - [`random`]: fresh challenges from the OS CSPRNG.
//! - [`weak_rng`]: jitter for staggering HELLOACK responses, from a cheap
//!   non-cryptographic PRNG.
//! - [`keywrap`]: the single-block AES-128 encryption that mixes two
//!   challenges through a long-term shared secret into a pairwise key.
//! - [`constant_time`]: timing-safe comparisons for challenges, used to
//!   defeat reflection probing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constant_time;
pub mod error;
pub mod keywrap;
pub mod random;
pub mod weak_rng;

pub use error::CryptoError;
pub use keywrap::derive_pairwise_key;
pub use weak_rng::WeakRng;

/// Length in bytes of a single challenge (`L` in spec.md, half of a pairwise key).
pub const CHALLENGE_LEN: usize = 8;

/// Length in bytes of a pairwise key, and of the `metadata` scratch area
/// that holds the two mixed challenges during a handshake.
pub const PAIRWISE_KEY_LEN: usize = 16;
