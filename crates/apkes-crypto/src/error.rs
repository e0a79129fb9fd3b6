//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The CSPRNG backing `fresh_challenge` failed to produce output
    #[error("random number generation failed")]
    RandomFailed,
}
