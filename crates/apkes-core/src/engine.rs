//! The handshake engine (spec.md §4): the state machine driving HELLO,
//! HELLOACK and ACK on both the initiator and responder side of a link.
//!
//! Generic over its three collaborators — [`LinkSecurityModule`],
//! [`NeighborTable`] and [`SchemeProvider`] — so the engine itself never
//! allocates a socket, a timer wheel or a certificate store; it only calls
//! through these seams, matching spec.md §6's "external collaborators"
//! list. There is no interior mutability and no locking: spec.md §5's
//! cooperative single-threaded model is enforced by the borrow checker
//! instead of a documented convention, since every engine method takes
//! `&mut self`.

use apkes_crypto::{CHALLENGE_LEN, PAIRWISE_KEY_LEN, WeakRng, constant_time, derive_pairwise_key, random};
use apkes_link::{LinkAddress, LinkSecurityModule, SecurityLevel, BROADCAST};

use crate::codec::{Ack, HELLOACK_IDENTIFIER, HELLO_IDENTIFIER, ACK_IDENTIFIER, Hello, HelloAck};
use crate::config::ApkesConfig;
use crate::error::CoreError;
use crate::neighbor::{NeighborHandle, NeighborIds, NeighborStatus, NeighborTable};
use crate::scheme::SchemeProvider;
use crate::timer::{jittered_delay_ms, WaitTimerPool};

/// The handshake engine for one node.
///
/// `N` is the wait-timer pool capacity and should equal
/// [`ApkesConfig::max_tentative_neighbors`] — the mismatch is not checked
/// at compile time (one is a const generic, the other a runtime field) but
/// [`HandshakeEngine::new`] asserts they agree, matching the original's
/// `MEMB` being sized directly off the same constant used everywhere else.
pub struct HandshakeEngine<L, T, S, const N: usize> {
    link: L,
    neighbors: T,
    scheme: S,
    config: ApkesConfig,
    our_addr: LinkAddress,
    our_short_addr: u16,
    our_challenge: [u8; CHALLENGE_LEN],
    timers: WaitTimerPool<N>,
    jitter_rng: WeakRng,
}

/// Trailer length used on the wire for HELLOACK/ACK: the sender's 2-byte
/// short address. EBEAP-style broadcast-key piggybacking is not
/// implemented by this engine (see `DESIGN.md`); `ApkesConfig::encryption_enabled`
/// is reserved for a future link-layer data-frame policy, not for the
/// handshake messages themselves.
const TRAILER_LEN: usize = 2;

impl<L, T, S, const N: usize> HandshakeEngine<L, T, S, N>
where
    L: LinkSecurityModule,
    T: NeighborTable,
    S: SchemeProvider,
{
    /// Construct an engine for the node at `our_addr`/`our_short_addr`.
    pub fn new(
        link: L,
        neighbors: T,
        mut scheme: S,
        config: ApkesConfig,
        our_addr: LinkAddress,
        our_short_addr: u16,
        jitter_rng: WeakRng,
    ) -> Self {
        assert_eq!(
            config.max_tentative_neighbors, N,
            "wait-timer pool capacity must match the configured tentative-neighbor bound"
        );
        scheme.init();
        Self {
            link,
            neighbors,
            scheme,
            config,
            our_addr,
            our_short_addr,
            our_challenge: [0u8; CHALLENGE_LEN],
            timers: WaitTimerPool::new(),
            jitter_rng,
        }
    }

    /// Borrow the neighbor table, e.g. for the demo binary to print state.
    pub fn neighbors(&self) -> &T {
        &self.neighbors
    }

    /// Number of free wait-timer slots, i.e. remaining HELLO-flood headroom.
    #[must_use]
    pub fn available_tentative_slots(&self) -> usize {
        self.timers.available()
    }

    /// Broadcast a HELLO with a freshly generated challenge (spec.md §4.1).
    pub fn broadcast_hello(&mut self) -> Result<(), CoreError> {
        self.our_challenge = random::fresh_challenge().unwrap_or_else(|_| {
            tracing::warn!("CSPRNG unavailable, broadcasting HELLO with a zero challenge");
            [0u8; CHALLENGE_LEN]
        });
        let hello = Hello {
            challenge: self.our_challenge,
            short_addr: self.our_short_addr,
        };
        let buf = self.link.prepare_command_frame(HELLO_IDENTIFIER, BROADCAST);
        buf.extend_from_slice(&hello.encode());
        self.link.add_security_header(SecurityLevel::None);
        self.link.send_command_frame()?;
        Ok(())
    }

    /// Handle an inbound HELLO (spec.md §4.2): allocate a tentative
    /// neighbor and a wait-timer, or drop it if either pool is exhausted.
    fn on_hello(&mut self, sender: LinkAddress, payload: &[u8], now_ms: u64) {
        let hello = match Hello::decode(payload) {
            Ok(h) => h,
            Err(err) => {
                tracing::debug!(%err, "dropping malformed HELLO");
                return;
            }
        };
        if self.neighbors.find_by_addr(sender).is_some() {
            tracing::trace!(sender, "dropping HELLO from an already-known neighbor");
            return;
        }
        let Some(handle) = self.neighbors.neighbor_new() else {
            tracing::debug!("neighbor table full, dropping HELLO");
            return;
        };
        {
            let n = self.neighbors.get_mut(handle).expect("just created");
            n.ids = NeighborIds {
                extended_addr: sender,
                short_addr: hello.short_addr,
            };
            n.status = NeighborStatus::Tentative;
            n.metadata[..CHALLENGE_LEN].copy_from_slice(&hello.challenge);
            n.expiration_time = now_ms + self.config.handshake_expiration().as_millis() as u64;
        }
        let max_wait_ms = self.config.max_waiting_period.as_millis() as u64;
        let deadline = now_ms + jittered_delay_ms(&mut self.jitter_rng, max_wait_ms);
        if self.timers.schedule(handle, deadline).is_none() {
            tracing::debug!("wait-timer pool full, dropping the neighbor we just created");
            self.remove_neighbor(handle);
        }
    }

    fn remove_neighbor(&mut self, handle: NeighborHandle) {
        self.neighbors.remove(handle);
    }

    /// Drain due wait-timers and fire [`HandshakeEngine::send_helloack`] for
    /// each one still tentative (spec.md §4.2 "wait_callback").
    pub fn poll_timers(&mut self, now_ms: u64) {
        for (_id, handle) in self.timers.take_expired(now_ms) {
            let still_tentative = matches!(
                self.neighbors.get(handle).map(|n| n.status),
                Some(NeighborStatus::Tentative)
            );
            if !still_tentative {
                continue;
            }
            if let Some(n) = self.neighbors.get_mut(handle) {
                n.status = NeighborStatus::TentativeAwaitingAck;
            }
            if let Err(err) = self.send_helloack(handle) {
                tracing::debug!(%err, "failed to send HELLOACK");
            }
        }
    }

    /// Send a HELLOACK to the neighbor at `handle`, deriving the pairwise
    /// key from our own fresh challenge and the HELLO sender's (spec.md
    /// §4.2). The message is authenticated (never encrypted — see the
    /// `TRAILER_LEN` note above) under that just-derived key.
    fn send_helloack(&mut self, handle: NeighborHandle) -> Result<(), CoreError> {
        let Some(n) = self.neighbors.get(handle) else {
            return Ok(());
        };
        let dest = n.ids.extended_addr;
        let challenge_a: [u8; CHALLENGE_LEN] = n.metadata[..CHALLENGE_LEN].try_into().unwrap();
        let challenge_b = random::fresh_challenge().unwrap_or_else(|_| {
            tracing::warn!("CSPRNG unavailable, sending HELLOACK with a zero challenge");
            [0u8; CHALLENGE_LEN]
        });

        let Some(shared_secret) = self.scheme.get_secret_with_hello_sender(dest) else {
            tracing::debug!(sender = dest, "no shared secret for HELLO sender, dropping");
            self.remove_neighbor(handle);
            return Ok(());
        };

        let mut metadata = [0u8; PAIRWISE_KEY_LEN];
        metadata[..CHALLENGE_LEN].copy_from_slice(&challenge_a);
        metadata[CHALLENGE_LEN..].copy_from_slice(&challenge_b);
        let pairwise_key = derive_pairwise_key(&metadata, &shared_secret);

        let local_index = {
            let n = self.neighbors.get_mut(handle).expect("checked above");
            n.metadata = metadata;
            n.pairwise_key = Some(pairwise_key);
            n.local_index
        };

        let helloack = HelloAck {
            challenge_a,
            challenge_b,
            local_index,
            trailer: self.our_short_addr.to_le_bytes().to_vec(),
        };
        let buf = self.link.prepare_command_frame(HELLOACK_IDENTIFIER, dest);
        buf.extend_from_slice(&helloack.encode());
        self.link.add_security_header(SecurityLevel::Authenticated);
        self.link.set_frame_key(pairwise_key);
        self.link.send_command_frame()?;
        Ok(())
    }

    /// Handle an inbound HELLOACK (spec.md §4.3). The pairwise key is
    /// derived straight from the payload's own challenge fields — this
    /// works without first looking up a neighbor table entry, which is
    /// what lets a still-unknown responder's HELLOACK be verified at all.
    fn on_helloack(&mut self, sender: LinkAddress, now_ms: u64) {
        let Some(shared_secret) = self.scheme.get_secret_with_helloack_sender(sender) else {
            tracing::debug!(sender, "no shared secret for HELLOACK sender, dropping");
            return;
        };

        // The payload is readable before verification (MIC-only protection
        // does not hide it), which is exactly what lets us compute the key
        // we then use to verify it.
        let raw = self.link.last_payload().to_vec();
        let Ok(helloack) = HelloAck::decode(&raw, TRAILER_LEN) else {
            tracing::debug!("dropping malformed HELLOACK");
            return;
        };

        if !constant_time::verify_challenge(&helloack.challenge_a, &self.our_challenge) {
            tracing::debug!(sender, "HELLOACK challenge mismatch, possible reflection, dropping");
            return;
        }

        let mut metadata = [0u8; PAIRWISE_KEY_LEN];
        metadata[..CHALLENGE_LEN].copy_from_slice(&helloack.challenge_a);
        metadata[CHALLENGE_LEN..].copy_from_slice(&helloack.challenge_b);
        let pairwise_key = derive_pairwise_key(&metadata, &shared_secret);

        if !self.link.decrypt_verify_unicast(&pairwise_key) {
            tracing::debug!(sender, "HELLOACK failed authentication, dropping");
            return;
        }
        let frame_counter = self.link.last_frame_counter();

        let handle = match self.neighbors.find_by_addr(sender) {
            Some(handle) => {
                let status = self.neighbors.get(handle).map(|n| n.status);
                match status {
                    Some(NeighborStatus::Permanent) => {
                        let replayed = self
                            .neighbors
                            .get(handle)
                            .is_some_and(|n| n.anti_replay_info.was_replayed(frame_counter));
                        if replayed {
                            tracing::debug!(sender, "replayed HELLOACK against a permanent neighbor, dropping");
                            return;
                        }
                        // Not a replay: accept it as a rekey, falling through
                        // to the commit block below to re-derive the key,
                        // update the neighbor and send a fresh ACK.
                        handle
                    }
                    Some(NeighborStatus::TentativeAwaitingAck) => {
                        tracing::debug!(sender, "unexpected HELLOACK while awaiting our own ACK, dropping");
                        return;
                    }
                    _ => handle,
                }
            }
            None => match self.neighbors.neighbor_new() {
                Some(handle) => handle,
                None => {
                    tracing::debug!("neighbor table full, dropping HELLOACK");
                    return;
                }
            },
        };

        {
            let n = self.neighbors.get_mut(handle).expect("just resolved");
            n.ids.extended_addr = sender;
            n.ids.short_addr = u16::from_le_bytes([helloack.trailer[0], helloack.trailer[1]]);
            n.metadata = metadata;
            n.pairwise_key = Some(pairwise_key);
            n.status = NeighborStatus::Permanent;
            n.expiration_time = now_ms + self.config.handshake_expiration().as_millis() as u64;
            n.anti_replay_info.accept(frame_counter);
        }
        self.neighbors.neighbor_update(handle, &helloack.trailer);

        if let Err(err) = self.send_ack(handle, helloack.local_index) {
            tracing::debug!(%err, "failed to send ACK");
        }
    }

    /// Send the closing ACK (spec.md §4.4). Always authenticated-only,
    /// regardless of configuration — matches the original's ACK rule.
    fn send_ack(&mut self, handle: NeighborHandle, _peer_local_index: u8) -> Result<(), CoreError> {
        let Some(n) = self.neighbors.get(handle) else {
            return Ok(());
        };
        let Some(key) = n.pairwise_key else {
            return Ok(());
        };
        let dest = n.ids.extended_addr;
        let local_index = n.local_index;

        let ack = Ack {
            local_index,
            trailer: self.our_short_addr.to_le_bytes().to_vec(),
        };
        let buf = self.link.prepare_command_frame(ACK_IDENTIFIER, dest);
        buf.extend_from_slice(&ack.encode());
        self.link.add_security_header(SecurityLevel::Authenticated);
        self.link.set_frame_key(key);
        self.link.send_command_frame()?;
        Ok(())
    }

    /// Handle an inbound ACK (spec.md §4.4): promote a `TentativeAwaitingAck`
    /// neighbor to `Permanent`.
    fn on_ack(&mut self, sender: LinkAddress) {
        let Some(handle) = self.neighbors.find_by_addr(sender) else {
            tracing::debug!(sender, "ACK from an unknown sender, dropping");
            return;
        };
        let (status, key) = match self.neighbors.get(handle) {
            Some(n) => (n.status, n.pairwise_key),
            None => return,
        };
        if status != NeighborStatus::TentativeAwaitingAck {
            tracing::debug!(sender, "unexpected ACK, dropping");
            return;
        }
        let Some(key) = key else {
            tracing::debug!(sender, "ACK for a neighbor with no pending key, dropping");
            return;
        };
        if !self.link.decrypt_verify_unicast(&key) {
            tracing::debug!(sender, "ACK failed authentication, dropping");
            return;
        }
        let frame_counter = self.link.last_frame_counter();
        if self
            .neighbors
            .get(handle)
            .is_some_and(|n| n.anti_replay_info.was_replayed(frame_counter))
        {
            tracing::debug!(sender, "replayed ACK, dropping");
            return;
        }
        let raw = self.link.last_payload().to_vec();
        let Ok(ack) = Ack::decode(&raw, TRAILER_LEN) else {
            tracing::debug!("dropping malformed ACK");
            return;
        };

        if let Some(n) = self.neighbors.get_mut(handle) {
            n.status = NeighborStatus::Permanent;
            n.anti_replay_info.accept(frame_counter);
        }
        self.neighbors.neighbor_update(handle, &ack.trailer);
    }

    /// Poll the link layer for one inbound frame and dispatch it. Returns
    /// `false` if nothing was pending. Call in a loop from the node's main
    /// cycle to drain the inbox.
    pub fn poll_inbound(&mut self, now_ms: u64) -> bool {
        if !self.link.poll_inbound() {
            return false;
        }
        self.on_command_frame(now_ms);
        true
    }

    /// Demultiplex the most recently received command frame (spec.md §4,
    /// the `on_command_frame` dispatcher). Called by
    /// [`HandshakeEngine::poll_inbound`] once the link layer has a frame
    /// ready.
    fn on_command_frame(&mut self, now_ms: u64) {
        let command_id = self.link.last_command_id();
        let sender = self.link.last_sender();
        match command_id {
            HELLO_IDENTIFIER => {
                let payload = self.link.last_payload().to_vec();
                self.on_hello(sender, &payload, now_ms);
            }
            HELLOACK_IDENTIFIER => self.on_helloack(sender, now_ms),
            ACK_IDENTIFIER => self.on_ack(sender),
            other => tracing::warn!(command_id = other, "dropping unknown command frame"),
        }
    }

    /// The pairwise key dispatcher (spec.md §9 design note): `Permanent`
    /// neighbors return their stored key; a `TentativeAwaitingAck`
    /// neighbor's key is re-derived from its metadata on demand rather
    /// than trusting a cache, matching the original `get_pairwise_key_with`.
    #[must_use]
    pub fn pairwise_key_for(&self, handle: NeighborHandle) -> Option<[u8; PAIRWISE_KEY_LEN]> {
        let n = self.neighbors.get(handle)?;
        match n.status {
            NeighborStatus::TentativeAwaitingAck => {
                let shared_secret = self
                    .scheme
                    .get_secret_with_hello_sender(n.ids.extended_addr)?;
                Some(derive_pairwise_key(&n.metadata, &shared_secret))
            }
            NeighborStatus::Permanent => n.pairwise_key,
            NeighborStatus::Tentative => None,
        }
    }

    /// Garbage-collect expired tentative handshakes.
    pub fn expire_neighbors(&mut self, now_ms: u64) {
        self.neighbors.remove_expired(now_ms);
    }

    /// Our own address, for the demo binary and tests.
    #[must_use]
    pub fn our_addr(&self) -> LinkAddress {
        self.our_addr
    }
}
