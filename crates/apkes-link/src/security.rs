//! The link-layer security module interface consumed by the handshake engine.
//!
//! This is the out-of-scope collaborator named in spec.md §1/§6: frame
//! construction, security-header attachment and AES-CCM\* encrypt/decrypt/
//! verify belong here, not in `apkes-core`. `apkes-core` depends only on the
//! [`LinkSecurityModule`] trait; [`crate::software`] provides the one
//! concrete implementation in this workspace, used by tests and the demo
//! binary.

use apkes_crypto::PAIRWISE_KEY_LEN;

use crate::error::LinkError;

/// A link-layer address. `0` is reserved for the broadcast address
/// (mirroring Contiki's `linkaddr_null`).
pub type LinkAddress = u64;

/// The broadcast address.
pub const BROADCAST: LinkAddress = 0;

/// Security level to attach to an outbound command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// No authentication, no encryption. Used for HELLO: its payload is
    /// public and no pairwise key exists yet to authenticate it under.
    None,
    /// MIC only: the frame is authenticated but not encrypted.
    Authenticated,
    /// MIC and encryption.
    AuthenticatedEncrypted,
}

/// 802.15.4-style key identification mode, carried in the frame attributes
/// so the recipient can locate the key it should decrypt/verify under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIdMode {
    /// Key index alone identifies the key (1-byte key id, used by ACK).
    OneByteIndex,
    /// Key index plus a 2-byte key source (short address) identifies the
    /// key (5-byte key id, used by HELLOACK).
    FiveByteIndexAndSource,
}

/// Frame attributes set on an outbound frame / read back from an inbound one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameAttrs {
    /// Key identification mode.
    pub key_id_mode: Option<KeyIdMode>,
    /// Key index (here: the command-frame identifier that produced the key).
    pub key_index: Option<u8>,
    /// Key source: the sender's short address, when `key_id_mode` is
    /// [`KeyIdMode::FiveByteIndexAndSource`].
    pub key_source_short: Option<u16>,
}

/// The link-layer security module, as consumed by the handshake engine.
///
/// Usage follows the same sequence the original imperative API used: the
/// caller prepares a frame, optionally attaches a security header and
/// attributes, writes the payload into the returned buffer, then sends.
/// Exactly one frame is "in progress" at a time — this matches the
/// single-threaded cooperative scheduling model (spec.md §5): a handler
/// runs to completion before another can start building a frame.
pub trait LinkSecurityModule {
    /// Allocate a command frame addressed to `dest` and return its
    /// writable payload buffer.
    fn prepare_command_frame(&mut self, command_id: u8, dest: LinkAddress) -> &mut Vec<u8>;

    /// Attach an authentication/encryption header to the frame in progress.
    fn add_security_header(&mut self, level: SecurityLevel);

    /// Set the pairwise key to protect the frame in progress with. Only
    /// meaningful once `add_security_header` requested a level other than
    /// [`SecurityLevel::None`].
    fn set_frame_key(&mut self, key: [u8; PAIRWISE_KEY_LEN]);

    /// Set a frame attribute on the frame in progress.
    fn set_attr(&mut self, attrs: FrameAttrs);

    /// Read an attribute off the most recently received frame.
    fn attr(&self) -> FrameAttrs;

    /// Hand the frame in progress to the radio, consuming it.
    fn send_command_frame(&mut self) -> Result<(), LinkError>;

    /// Try to receive the next inbound frame, making it available through
    /// `last_*`/`decrypt_verify_unicast`. Returns `false` if none is
    /// pending. A real radio driver would implement this off an interrupt
    /// or DMA-filled ring buffer rather than a medium poll.
    fn poll_inbound(&mut self) -> bool;

    /// Decrypt-and-verify the most recently received unicast frame under
    /// `key`. On success, the verified plaintext payload is available via
    /// [`LinkSecurityModule::last_payload`].
    fn decrypt_verify_unicast(&mut self, key: &[u8; PAIRWISE_KEY_LEN]) -> bool;

    /// The payload bytes of the most recently received frame (after
    /// [`LinkSecurityModule::decrypt_verify_unicast`] for protected frames,
    /// or immediately for unauthenticated ones like HELLO).
    fn last_payload(&self) -> &[u8];

    /// The sender address of the most recently received frame.
    fn last_sender(&self) -> LinkAddress;

    /// The command-frame identifier of the most recently received frame.
    fn last_command_id(&self) -> u8;

    /// The frame counter of the most recently received frame, for the
    /// neighbor table's anti-replay bookkeeping.
    fn last_frame_counter(&self) -> u32;
}
