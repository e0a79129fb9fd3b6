//! Wire encoding for HELLO, HELLOACK and ACK payloads (spec.md §4.3).
//!
//! The command-frame identifier byte is not part of these payloads: the
//! link-layer security module demultiplexes on it before handing a payload
//! to this codec (see [`crate::engine::HandshakeEngine::on_command_frame`]),
//! mirroring how the original C's `on_command_frame` already strips it
//! before dispatch.

use apkes_crypto::CHALLENGE_LEN;

use crate::error::CodecError;

/// HELLO command-frame identifier.
pub const HELLO_IDENTIFIER: u8 = 0x0A;
/// HELLOACK command-frame identifier.
pub const HELLOACK_IDENTIFIER: u8 = 0x0B;
/// ACK command-frame identifier.
pub const ACK_IDENTIFIER: u8 = 0x0C;

/// A decoded HELLO payload: a fresh challenge and the sender's short address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    /// The challenge the sender expects echoed back in the HELLOACK.
    pub challenge: [u8; CHALLENGE_LEN],
    /// The sender's short address, so the recipient can address the
    /// HELLOACK without waiting on a separate address-resolution step.
    pub short_addr: u16,
}

impl Hello {
    /// Encoded length in bytes.
    pub const LEN: usize = CHALLENGE_LEN + 2;

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.extend_from_slice(&self.challenge);
        buf.extend_from_slice(&self.short_addr.to_le_bytes());
        buf
    }

    /// Decode from a received payload.
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < Self::LEN {
            return Err(CodecError::TooShort {
                expected: Self::LEN,
                actual: payload.len(),
            });
        }
        let mut challenge = [0u8; CHALLENGE_LEN];
        challenge.copy_from_slice(&payload[..CHALLENGE_LEN]);
        let short_addr = u16::from_le_bytes([payload[CHALLENGE_LEN], payload[CHALLENGE_LEN + 1]]);
        Ok(Self {
            challenge,
            short_addr,
        })
    }
}

/// A decoded HELLOACK payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloAck {
    /// The HELLO sender's own challenge, echoed back for verification.
    pub challenge_a: [u8; CHALLENGE_LEN],
    /// The HELLOACK sender's freshly generated challenge.
    pub challenge_b: [u8; CHALLENGE_LEN],
    /// The HELLOACK sender's `local_index`, for compact future key lookups.
    pub local_index: u8,
    /// Either the EBEAP broadcast key (16 bytes, when encryption is
    /// enabled) or the HELLOACK sender's node id (2 bytes, otherwise).
    /// Opaque to the codec — `neighbor_update` interprets it.
    pub trailer: Vec<u8>,
}

impl HelloAck {
    const FIXED_LEN: usize = CHALLENGE_LEN * 2 + 1;

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::FIXED_LEN + self.trailer.len());
        buf.extend_from_slice(&self.challenge_a);
        buf.extend_from_slice(&self.challenge_b);
        buf.push(self.local_index);
        buf.extend_from_slice(&self.trailer);
        buf
    }

    /// Decode from a received payload. `trailer_len` is supplied by the
    /// caller because its length depends on which security level the
    /// frame attributes reported (spec.md §4.3: encrypted HELLOACK carries
    /// a 16-byte broadcast key, plaintext carries a 2-byte node id).
    pub fn decode(payload: &[u8], trailer_len: usize) -> Result<Self, CodecError> {
        let total = Self::FIXED_LEN + trailer_len;
        if payload.len() < total {
            return Err(CodecError::TooShort {
                expected: total,
                actual: payload.len(),
            });
        }
        let mut challenge_a = [0u8; CHALLENGE_LEN];
        challenge_a.copy_from_slice(&payload[..CHALLENGE_LEN]);
        let mut challenge_b = [0u8; CHALLENGE_LEN];
        challenge_b.copy_from_slice(&payload[CHALLENGE_LEN..CHALLENGE_LEN * 2]);
        let local_index = payload[CHALLENGE_LEN * 2];
        let trailer = payload[Self::FIXED_LEN..total].to_vec();
        Ok(Self {
            challenge_a,
            challenge_b,
            local_index,
            trailer,
        })
    }
}

/// A decoded ACK payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// The ACK sender's `local_index`.
    pub local_index: u8,
    /// Same trailer convention as [`HelloAck::trailer`].
    pub trailer: Vec<u8>,
}

impl Ack {
    const FIXED_LEN: usize = 1;

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::FIXED_LEN + self.trailer.len());
        buf.push(self.local_index);
        buf.extend_from_slice(&self.trailer);
        buf
    }

    /// Decode from a received payload.
    pub fn decode(payload: &[u8], trailer_len: usize) -> Result<Self, CodecError> {
        let total = Self::FIXED_LEN + trailer_len;
        if payload.len() < total {
            return Err(CodecError::TooShort {
                expected: total,
                actual: payload.len(),
            });
        }
        Ok(Self {
            local_index: payload[0],
            trailer: payload[Self::FIXED_LEN..total].to_vec(),
        })
    }
}
