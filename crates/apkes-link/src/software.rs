//! A software reference implementation of [`LinkSecurityModule`], backed by
//! an in-memory broadcast medium.
//!
//! This is the one concrete backend in this workspace: real deployments
//! would plug in a radio driver and an 802.15.4 security header
//! implementation instead. It performs actual AES-CCM\* (the `ccm` crate
//! over `aes::Aes128`) so that handshake tests exercise real authentication
//! and encryption failures, not a mocked-out verify-always stub.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use aead::{AeadInPlace, KeyInit, generic_array::GenericArray};
use apkes_crypto::PAIRWISE_KEY_LEN;
use ccm::Ccm;
use ccm::consts::{U8, U13};

use crate::error::LinkError;
use crate::security::{BROADCAST, FrameAttrs, LinkAddress, LinkSecurityModule, SecurityLevel};

type Ccm128 = Ccm<aes::Aes128, U8, U13>;

const TAG_LEN: usize = 8;

/// One frame on the wire, including whatever security metadata the sender
/// attached.
#[derive(Debug, Clone)]
struct WireFrame {
    src: LinkAddress,
    command_id: u8,
    security_level: SecurityLevel,
    attrs: FrameAttrs,
    frame_counter: u32,
    /// Payload (cleartext for `None`/`Authenticated`, ciphertext for
    /// `AuthenticatedEncrypted`) with an appended MIC for any protected level.
    body: Vec<u8>,
}

/// A shared in-memory medium: a broadcast frame is delivered to every other
/// registered node; a unicast frame only to its destination.
#[derive(Default)]
struct MediumInner {
    inboxes: HashMap<LinkAddress, VecDeque<WireFrame>>,
}

/// Handle to a shared simulated medium. Clone to share between nodes.
#[derive(Clone, Default)]
pub struct Medium(Rc<RefCell<MediumInner>>);

impl Medium {
    /// Create a new, empty medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node so it can receive frames.
    pub fn register(&self, addr: LinkAddress) {
        self.0.borrow_mut().inboxes.entry(addr).or_default();
    }

    fn deliver(&self, dest: LinkAddress, src: LinkAddress, frame: WireFrame) {
        let mut inner = self.0.borrow_mut();
        if dest == BROADCAST {
            let targets: Vec<LinkAddress> =
                inner.inboxes.keys().copied().filter(|a| *a != src).collect();
            for target in targets {
                inner
                    .inboxes
                    .entry(target)
                    .or_default()
                    .push_back(frame.clone());
            }
        } else if let Some(inbox) = inner.inboxes.get_mut(&dest) {
            inbox.push_back(frame);
        }
    }

    /// Pop the next frame addressed to `addr`, if any.
    fn poll(&self, addr: LinkAddress) -> Option<WireFrame> {
        self.0.borrow_mut().inboxes.get_mut(&addr)?.pop_front()
    }

    /// Whether any frame is queued for `addr`.
    #[must_use]
    pub fn has_pending(&self, addr: LinkAddress) -> bool {
        self.0
            .borrow()
            .inboxes
            .get(&addr)
            .is_some_and(|q| !q.is_empty())
    }
}

struct TxFrame {
    command_id: u8,
    dest: LinkAddress,
    payload: Vec<u8>,
    security_level: SecurityLevel,
    attrs: FrameAttrs,
    key: Option<[u8; PAIRWISE_KEY_LEN]>,
}

/// The software [`LinkSecurityModule`] for one simulated node.
pub struct SoftwareLinkSecurity {
    local_addr: LinkAddress,
    medium: Medium,
    frame_counter: u32,
    tx: Option<TxFrame>,
    rx: Option<(WireFrame, Vec<u8>)>,
}

impl SoftwareLinkSecurity {
    /// Create a module for the node at `local_addr`, registering it on
    /// `medium`.
    #[must_use]
    pub fn new(local_addr: LinkAddress, medium: Medium) -> Self {
        medium.register(local_addr);
        Self {
            local_addr,
            medium,
            frame_counter: 0,
            tx: None,
            rx: None,
        }
    }

    /// This node's address.
    #[must_use]
    pub fn local_addr(&self) -> LinkAddress {
        self.local_addr
    }

    /// Poll the medium and load the next inbound frame, if any.
    ///
    /// `None` and `Authenticated` frames carry their payload in the clear
    /// on the wire (MIC-only protection authenticates but does not hide
    /// it), so both are readable via [`LinkSecurityModule::last_payload`]
    /// immediately, before authenticity is confirmed — a handshake message
    /// can need to read its own cleartext fields to derive the very key it
    /// will then use to verify the frame. `AuthenticatedEncrypted` frames
    /// are queued with no payload until
    /// [`LinkSecurityModule::decrypt_verify_unicast`] succeeds.
    pub fn poll(&mut self) -> Option<(u8, LinkAddress)> {
        let frame = self.medium.poll(self.local_addr)?;
        let command_id = frame.command_id;
        let src = frame.src;
        match frame.security_level {
            SecurityLevel::None => {
                let payload = frame.body.clone();
                self.rx = Some((frame, payload));
            }
            SecurityLevel::Authenticated => {
                let split = frame.body.len().saturating_sub(TAG_LEN);
                let payload = frame.body[..split].to_vec();
                self.rx = Some((frame, payload));
            }
            SecurityLevel::AuthenticatedEncrypted => {
                self.rx = Some((frame, Vec::new()));
            }
        }
        Some((command_id, src))
    }

    fn nonce(src: LinkAddress, counter: u32) -> GenericArray<u8, U13> {
        let mut nonce = [0u8; 13];
        nonce[..8].copy_from_slice(&src.to_le_bytes());
        nonce[8..12].copy_from_slice(&counter.to_le_bytes());
        GenericArray::from(nonce)
    }
}

impl LinkSecurityModule for SoftwareLinkSecurity {
    fn prepare_command_frame(&mut self, command_id: u8, dest: LinkAddress) -> &mut Vec<u8> {
        self.tx = Some(TxFrame {
            command_id,
            dest,
            payload: Vec::new(),
            security_level: SecurityLevel::None,
            attrs: FrameAttrs::default(),
            key: None,
        });
        &mut self.tx.as_mut().expect("just set").payload
    }

    fn add_security_header(&mut self, level: SecurityLevel) {
        if let Some(tx) = &mut self.tx {
            tx.security_level = level;
        }
    }

    fn set_frame_key(&mut self, key: [u8; PAIRWISE_KEY_LEN]) {
        if let Some(tx) = &mut self.tx {
            tx.key = Some(key);
        }
    }

    fn set_attr(&mut self, attrs: FrameAttrs) {
        if let Some(tx) = &mut self.tx {
            tx.attrs = attrs;
        }
    }

    fn attr(&self) -> FrameAttrs {
        self.rx.as_ref().map(|(f, _)| f.attrs).unwrap_or_default()
    }

    fn poll_inbound(&mut self) -> bool {
        self.poll().is_some()
    }

    fn send_command_frame(&mut self) -> Result<(), LinkError> {
        let mut tx = self.tx.take().ok_or(LinkError::NoFrameInProgress)?;
        self.frame_counter += 1;
        if tx.security_level != SecurityLevel::None {
            let key = tx.key.unwrap_or([0u8; PAIRWISE_KEY_LEN]);
            protect(
                &key,
                self.local_addr,
                self.frame_counter,
                tx.security_level,
                &mut tx.payload,
            );
        }
        let frame = WireFrame {
            src: self.local_addr,
            command_id: tx.command_id,
            security_level: tx.security_level,
            attrs: tx.attrs,
            frame_counter: self.frame_counter,
            body: tx.payload,
        };
        self.medium.deliver(tx.dest, self.local_addr, frame);
        Ok(())
    }

    fn decrypt_verify_unicast(&mut self, key: &[u8; PAIRWISE_KEY_LEN]) -> bool {
        let Some((frame, _)) = self.rx.take() else {
            return false;
        };
        if frame.security_level == SecurityLevel::None {
            self.rx = Some((frame.clone(), frame.body));
            return true;
        }
        if frame.body.len() < TAG_LEN {
            return false;
        }
        let cipher = Ccm128::new(GenericArray::from_slice(key));
        let nonce = Self::nonce(frame.src, frame.frame_counter);
        let split = frame.body.len() - TAG_LEN;
        let tag = GenericArray::clone_from_slice(&frame.body[split..]);

        let verified = match frame.security_level {
            SecurityLevel::Authenticated => {
                let aad = &frame.body[..split];
                cipher
                    .decrypt_in_place_detached(&nonce, aad, &mut [], &tag)
                    .map(|()| frame.body[..split].to_vec())
            }
            SecurityLevel::AuthenticatedEncrypted => {
                let mut buf = frame.body[..split].to_vec();
                cipher
                    .decrypt_in_place_detached(&nonce, &[], &mut buf, &tag)
                    .map(|()| buf)
            }
            SecurityLevel::None => unreachable!(),
        };

        match verified {
            Ok(payload) => {
                self.rx = Some((frame, payload));
                true
            }
            Err(_) => false,
        }
    }

    fn last_payload(&self) -> &[u8] {
        self.rx.as_ref().map_or(&[], |(_, p)| p.as_slice())
    }

    fn last_sender(&self) -> LinkAddress {
        self.rx.as_ref().map_or(BROADCAST, |(f, _)| f.src)
    }

    fn last_command_id(&self) -> u8 {
        self.rx.as_ref().map_or(0, |(f, _)| f.command_id)
    }

    fn last_frame_counter(&self) -> u32 {
        self.rx.as_ref().map_or(0, |(f, _)| f.frame_counter)
    }
}

/// Protect (authenticate, optionally encrypt) a frame's payload in place.
/// Applied by [`SoftwareLinkSecurity::send_command_frame`] once a level
/// other than `None` was requested via `add_security_header` and a key via
/// `set_frame_key`; `apkes-core` never calls this directly, it only writes
/// cleartext into the buffer returned by `prepare_command_frame`.
fn protect(
    key: &[u8; PAIRWISE_KEY_LEN],
    src: LinkAddress,
    counter: u32,
    level: SecurityLevel,
    payload: &mut Vec<u8>,
) {
    if level == SecurityLevel::None {
        return;
    }
    let cipher = Ccm128::new(GenericArray::from_slice(key));
    let nonce = SoftwareLinkSecurity::nonce(src, counter);
    let tag = match level {
        SecurityLevel::Authenticated => cipher
            .encrypt_in_place_detached(&nonce, payload.as_slice(), &mut [])
            .expect("CCM tag generation cannot fail for valid input lengths"),
        SecurityLevel::AuthenticatedEncrypted => cipher
            .encrypt_in_place_detached(&nonce, &[], payload.as_mut_slice())
            .expect("CCM tag generation cannot fail for valid input lengths"),
        SecurityLevel::None => unreachable!(),
    };
    payload.extend_from_slice(&tag);
}
