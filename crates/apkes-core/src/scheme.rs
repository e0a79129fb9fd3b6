//! The underlying key-exchange scheme (spec.md §3 "Design note", §9): how
//! two nodes that have never met agree on the `shared_secret` that
//! [`apkes_crypto::derive_pairwise_key`] turns into a pairwise key.
//!
//! The handshake engine only ever calls through this trait — it is
//! intentionally ignorant of whether the secret comes from a pre-shared
//! network key, a certificate exchange, or something else entirely. The
//! original C leaves this scheme-specific (elliptic-curve certificates in
//! its reference deployment); [`PreSharedNetworkSecret`] is the one
//! concrete provider in this workspace, sufficient for the demo binary and
//! for exercising the handshake engine in tests without pulling in a
//! certificate stack.

use apkes_crypto::PAIRWISE_KEY_LEN;
use apkes_link::LinkAddress;

/// Supplies the `shared_secret` half of pairwise key derivation.
///
/// Both `get_secret_with_*` methods exist separately, mirroring the
/// original two call sites, because a real scheme may need to know which
/// handshake message triggered the lookup (e.g. to pick a different
/// certificate-exchange sub-protocol for each); the trivial provider here
/// treats them identically.
pub trait SchemeProvider {
    /// One-time setup, called before the bootstrap driver sends the first
    /// HELLO (mirrors `coresec_scheme::init`).
    fn init(&mut self) {}

    /// The shared secret to use with the sender of a HELLO we are
    /// responding to, or `None` if this scheme has no way to authenticate
    /// that sender at all.
    fn get_secret_with_hello_sender(&self, sender: LinkAddress) -> Option<[u8; PAIRWISE_KEY_LEN]>;

    /// The shared secret to use with the sender of a HELLOACK we are
    /// verifying.
    fn get_secret_with_helloack_sender(
        &self,
        sender: LinkAddress,
    ) -> Option<[u8; PAIRWISE_KEY_LEN]>;
}

/// The simplest possible scheme: every node in the network is provisioned
/// with the same 16-byte secret out of band, and any two nodes can derive
/// a pairwise key from it. Adequate for a closed deployment or for tests;
/// a production network would swap this for a certificate- or
/// identity-based provider without touching the handshake engine.
#[derive(Debug, Clone, Copy)]
pub struct PreSharedNetworkSecret {
    secret: [u8; PAIRWISE_KEY_LEN],
}

impl PreSharedNetworkSecret {
    /// Wrap a pre-provisioned network secret.
    #[must_use]
    pub fn new(secret: [u8; PAIRWISE_KEY_LEN]) -> Self {
        Self { secret }
    }
}

impl SchemeProvider for PreSharedNetworkSecret {
    fn get_secret_with_hello_sender(
        &self,
        _sender: LinkAddress,
    ) -> Option<[u8; PAIRWISE_KEY_LEN]> {
        Some(self.secret)
    }

    fn get_secret_with_helloack_sender(
        &self,
        _sender: LinkAddress,
    ) -> Option<[u8; PAIRWISE_KEY_LEN]> {
        Some(self.secret)
    }
}
