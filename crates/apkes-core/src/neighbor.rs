//! The neighbor table (spec.md §3, §6): the central data model and the
//! external collaborator the handshake engine mutates.
//!
//! `NeighborTable` is a trait so `apkes-core` never assumes a particular
//! allocation strategy; [`ArrayNeighborTable`] is the one implementation in
//! this workspace, sized at compile time to honor the "~10 kB RAM" budget
//! from spec.md §1 — no heap growth, a fixed number of slots.

use apkes_crypto::PAIRWISE_KEY_LEN;
use apkes_link::LinkAddress;
use zeroize::Zeroize;

/// A neighbor's pair of link addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighborIds {
    /// Extended (64-bit) address — stable, globally unique.
    pub extended_addr: LinkAddress,
    /// Short (16-bit) address — compact, assigned per-network.
    pub short_addr: u16,
}

/// A neighbor's position in the handshake lifecycle (spec.md §3 "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborStatus {
    /// HELLO accepted from an unknown peer; a HELLOACK has not been sent yet.
    Tentative,
    /// HELLOACK sent; waiting for ACK.
    TentativeAwaitingAck,
    /// Handshake complete; `pairwise_key` is authoritative.
    Permanent,
}

/// Per-peer replay state. A full 802.15.4 anti-replay window is the link
/// security module's concern; the one check the handshake engine itself
/// must make is "has this exact HELLOACK frame counter been seen before",
/// to reject a replayed HELLOACK against an already-`Permanent` neighbor
/// (spec.md §4.4 step 5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AntiReplayInfo {
    highest_seen: u32,
}

impl AntiReplayInfo {
    /// Returns `true` if `counter` has already been seen (i.e. this frame
    /// is a replay), without updating state. Call
    /// [`AntiReplayInfo::accept`] once the frame is actually accepted.
    #[must_use]
    pub fn was_replayed(&self, counter: u32) -> bool {
        counter != 0 && counter <= self.highest_seen
    }

    /// Record `counter` as the highest accepted frame counter so far.
    pub fn accept(&mut self, counter: u32) {
        self.highest_seen = self.highest_seen.max(counter);
    }
}

/// A neighbor table entry (spec.md §3 "Neighbor").
pub struct Neighbor {
    /// This neighbor's addresses.
    pub ids: NeighborIds,
    /// Lifecycle status.
    pub status: NeighborStatus,
    /// Pairwise session key, meaningful only once `status == Permanent`
    /// (or, transiently, once computed for a `TentativeAwaitingAck`
    /// neighbor about to send/verify a frame under it).
    pub pairwise_key: Option<[u8; PAIRWISE_KEY_LEN]>,
    /// Scratch area: `challenge_peer ‖ challenge_ours` during the
    /// handshake, consumed by key derivation once both halves are set.
    pub metadata: [u8; PAIRWISE_KEY_LEN],
    /// Per-peer replay state.
    pub anti_replay_info: AntiReplayInfo,
    /// Small integer identifying this entry to the peer for compact key
    /// lookups. Unique over all live neighbors by construction: it is the
    /// entry's table slot index.
    pub local_index: u8,
    /// Wall-clock second at which an unfinished handshake should be
    /// garbage-collected.
    pub expiration_time: u64,
}

impl Drop for Neighbor {
    fn drop(&mut self) {
        self.pairwise_key.zeroize();
        self.metadata.zeroize();
    }
}

impl Neighbor {
    fn new(local_index: u8) -> Self {
        Self {
            ids: NeighborIds::default(),
            status: NeighborStatus::Tentative,
            pairwise_key: None,
            metadata: [0u8; PAIRWISE_KEY_LEN],
            anti_replay_info: AntiReplayInfo::default(),
            local_index,
            expiration_time: 0,
        }
    }
}

/// A handle into a [`NeighborTable`]. Non-owning: wait-timers hold this,
/// not a reference to the `Neighbor` itself (design note in spec.md §9).
pub type NeighborHandle = usize;

/// The neighbor table: the external collaborator named in spec.md §1/§6.
///
/// `apkes-core` only ever reaches a `Neighbor` through this trait — it
/// never owns the storage.
pub trait NeighborTable {
    /// Allocate a new tentative neighbor entry. Returns `None` if the table
    /// is full (spec.md §7: resource exhaustion is drop-and-log, not an error).
    fn neighbor_new(&mut self) -> Option<NeighborHandle>;

    /// Borrow a neighbor by handle.
    fn get(&self, handle: NeighborHandle) -> Option<&Neighbor>;

    /// Mutably borrow a neighbor by handle.
    fn get_mut(&mut self, handle: NeighborHandle) -> Option<&mut Neighbor>;

    /// Find a neighbor already known by extended address.
    fn find_by_addr(&self, addr: LinkAddress) -> Option<NeighborHandle>;

    /// Update a neighbor's addresses (e.g. once its short address becomes
    /// known from a HELLO/HELLOACK payload).
    fn neighbor_update_ids(&mut self, handle: NeighborHandle, ids: NeighborIds) {
        if let Some(n) = self.get_mut(handle) {
            n.ids = ids;
        }
    }

    /// Commit a successful handshake step: promote to `Permanent` and hand
    /// the opaque EBEAP trailer to whatever installs the broadcast key.
    /// Called from both `on_helloack` (trailer = HELLOACK's tail) and
    /// `on_ack` (trailer = ACK's tail) — spec.md §9 open question: the
    /// external table must tolerate both encodings, so this default only
    /// promotes status and leaves trailer interpretation to an override.
    fn neighbor_update(&mut self, handle: NeighborHandle, _trailer: &[u8]) {
        if let Some(n) = self.get_mut(handle) {
            n.status = NeighborStatus::Permanent;
        }
    }

    /// Drop any neighbor whose `expiration_time` is at or before `now`
    /// and whose handshake never completed.
    fn remove_expired(&mut self, now: u64);

    /// Unconditionally drop a neighbor, e.g. after a handshake step fails
    /// partway through (no shared secret, pool exhaustion downstream).
    fn remove(&mut self, handle: NeighborHandle);

    /// Iterate over live neighbor handles.
    fn handles(&self) -> Vec<NeighborHandle>;
}

/// A fixed-capacity [`NeighborTable`] backed by an array of `N` slots — no
/// heap growth, matching the constrained-RAM budget in spec.md §1.
pub struct ArrayNeighborTable<const N: usize> {
    slots: [Option<Neighbor>; N],
}

impl<const N: usize> Default for ArrayNeighborTable<N> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl<const N: usize> ArrayNeighborTable<N> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const N: usize> NeighborTable for ArrayNeighborTable<N> {
    fn neighbor_new(&mut self) -> Option<NeighborHandle> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(Neighbor::new(
            u8::try_from(idx).expect("neighbor table capacity fits in u8"),
        ));
        Some(idx)
    }

    fn get(&self, handle: NeighborHandle) -> Option<&Neighbor> {
        self.slots.get(handle)?.as_ref()
    }

    fn get_mut(&mut self, handle: NeighborHandle) -> Option<&mut Neighbor> {
        self.slots.get_mut(handle)?.as_mut()
    }

    fn find_by_addr(&self, addr: LinkAddress) -> Option<NeighborHandle> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(n) if n.ids.extended_addr == addr))
    }

    fn remove_expired(&mut self, now: u64) {
        for slot in &mut self.slots {
            let expired = matches!(slot, Some(n) if n.status != NeighborStatus::Permanent && n.expiration_time <= now);
            if expired {
                tracing::debug!("neighbor table: garbage-collecting expired tentative handshake");
                *slot = None;
            }
        }
    }

    fn handles(&self) -> Vec<NeighborHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
            .collect()
    }

    fn remove(&mut self, handle: NeighborHandle) {
        if let Some(slot) = self.slots.get_mut(handle) {
            *slot = None;
        }
    }
}
