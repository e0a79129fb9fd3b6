//! End-to-end two-node bootstrap (spec.md §8 scenario 1: "happy path").

use apkes_core::{
    ApkesConfig, ArrayNeighborTable, HandshakeEngine, NeighborStatus, NeighborTable,
    PreSharedNetworkSecret,
};
use apkes_crypto::{PAIRWISE_KEY_LEN, WeakRng};
use apkes_link::software::{Medium, SoftwareLinkSecurity};

const POOL: usize = 2;

type Engine = HandshakeEngine<SoftwareLinkSecurity, ArrayNeighborTable<POOL>, PreSharedNetworkSecret, POOL>;

fn node(addr: u64, medium: &Medium, config: &ApkesConfig, secret: [u8; PAIRWISE_KEY_LEN]) -> Engine {
    HandshakeEngine::new(
        SoftwareLinkSecurity::new(addr, medium.clone()),
        ArrayNeighborTable::new(),
        PreSharedNetworkSecret::new(secret),
        config.clone(),
        addr,
        addr as u16,
        WeakRng::new(addr ^ 0xABCD),
    )
}

fn drain(engine: &mut Engine, now_ms: u64) {
    while engine.poll_inbound(now_ms) {}
}

/// Two nodes, one shared network secret, one HELLO round each: both should
/// end up `Permanent` neighbors of each other holding the same pairwise key.
#[test]
fn two_nodes_complete_a_full_handshake_and_agree_on_a_key() {
    let medium = Medium::new();
    let secret = [0x5Au8; PAIRWISE_KEY_LEN];
    let config = ApkesConfig {
        rounds: 1,
        round_duration: std::time::Duration::from_millis(50),
        max_tentative_neighbors: POOL,
        max_waiting_period: std::time::Duration::from_millis(5),
        ack_delay: std::time::Duration::from_millis(5),
        encryption_enabled: false,
    };

    let mut alice = node(1, &medium, &config, secret);
    let mut bob = node(2, &medium, &config, secret);

    let mut now = 0u64;
    alice.broadcast_hello().unwrap();
    now += 1;

    // Bob receives the HELLO and schedules a jittered HELLOACK.
    drain(&mut bob, now);
    assert_eq!(bob.available_tentative_slots(), POOL - 1);

    // Let every wait-timer in the simulation fire.
    for _ in 0..20 {
        now += 1;
        bob.poll_timers(now);
        drain(&mut bob, now);
        drain(&mut alice, now);
    }

    let alice_handle = alice.neighbors().find_by_addr(2).expect("alice knows bob");
    let bob_handle = bob.neighbors().find_by_addr(1).expect("bob knows alice");

    let alice_neighbor = alice.neighbors().get(alice_handle).unwrap();
    let bob_neighbor = bob.neighbors().get(bob_handle).unwrap();

    assert_eq!(alice_neighbor.status, NeighborStatus::Permanent);
    assert_eq!(bob_neighbor.status, NeighborStatus::Permanent);
    assert!(alice_neighbor.pairwise_key.is_some());
    assert_eq!(alice_neighbor.pairwise_key, bob_neighbor.pairwise_key);
}

/// Without a shared secret, a HELLO is answered with a HELLOACK that the
/// sender can never verify (no `SchemeProvider` entry) — the handshake
/// must not silently "succeed" with mismatched keys.
#[test]
fn mismatched_network_secrets_never_reach_permanent() {
    let medium = Medium::new();
    let config = ApkesConfig {
        rounds: 1,
        round_duration: std::time::Duration::from_millis(50),
        max_tentative_neighbors: POOL,
        max_waiting_period: std::time::Duration::from_millis(5),
        ack_delay: std::time::Duration::from_millis(5),
        encryption_enabled: false,
    };

    let mut alice = node(1, &medium, &config, [0x11u8; PAIRWISE_KEY_LEN]);
    let mut bob = node(2, &medium, &config, [0x22u8; PAIRWISE_KEY_LEN]);

    let mut now = 0u64;
    alice.broadcast_hello().unwrap();
    now += 1;
    drain(&mut bob, now);

    for _ in 0..20 {
        now += 1;
        bob.poll_timers(now);
        drain(&mut bob, now);
        drain(&mut alice, now);
    }

    assert!(alice.neighbors().find_by_addr(2).is_none());
}
