//! Error types for the APKES core protocol.
//!
//! Per spec.md §7, protocol-level failures (resource exhaustion, unknown
//! secret, MAC failure, challenge mismatch, replay) are never surfaced as
//! `Err` — they are logged and the frame is dropped. The errors here are
//! for the genuine fallibility that remains: a command frame too short or
//! malformed for the codec to parse at all.

use thiserror::Error;

/// Core protocol errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Codec error decoding a command frame payload.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The link-layer security module reported a transport failure.
    #[error("link error: {0}")]
    Link(#[from] apkes_link::LinkError),
}

/// Errors decoding HELLO/HELLOACK/ACK payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload shorter than the fixed-size fields of this command require.
    #[error("payload too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum required length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },
}
