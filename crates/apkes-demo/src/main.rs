//! APKES bootstrap demo
//!
//! Runs two simulated nodes through a full HELLO/HELLOACK/ACK bootstrap
//! over an in-memory medium and reports the pairwise key each side ends up
//! with, to demonstrate that both sides converge on the same secret.

use apkes_core::{ApkesConfig, ArrayNeighborTable, BootstrapDriver, HandshakeEngine, PreSharedNetworkSecret};
use apkes_crypto::{PAIRWISE_KEY_LEN, WeakRng};
use apkes_link::software::{Medium, SoftwareLinkSecurity};
use clap::Parser;

/// Wait-timer pool capacity used by this demo; must match `--max-tentative`.
const POOL_CAPACITY: usize = 4;

/// Simulate a two-node APKES bootstrap and print the resulting pairwise keys.
#[derive(Parser)]
#[command(name = "apkes-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    /// Number of HELLO broadcast rounds
    #[arg(long, default_value_t = 3)]
    rounds: u8,

    /// Round spacing, in milliseconds
    #[arg(long, default_value_t = 50)]
    round_duration_ms: u64,

    /// Pre-shared network secret, as 32 hex characters (16 bytes)
    #[arg(long, default_value = "00112233445566778899aabbccddeeff")]
    network_secret_hex: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose { "debug" } else { "info" })
        .init();

    let secret = parse_secret(&cli.network_secret_hex)?;

    let medium = Medium::new();
    let config = ApkesConfig {
        rounds: cli.rounds,
        round_duration: std::time::Duration::from_millis(cli.round_duration_ms),
        max_tentative_neighbors: POOL_CAPACITY,
        max_waiting_period: std::time::Duration::from_millis(cli.round_duration_ms / 4),
        ack_delay: std::time::Duration::from_millis(cli.round_duration_ms / 4),
        ..ApkesConfig::default()
    };

    let mut alice = HandshakeEngine::<_, _, _, POOL_CAPACITY>::new(
        SoftwareLinkSecurity::new(1, medium.clone()),
        ArrayNeighborTable::<POOL_CAPACITY>::new(),
        PreSharedNetworkSecret::new(secret),
        config.clone(),
        1,
        0x0001,
        WeakRng::new(1),
    );
    let mut bob = HandshakeEngine::<_, _, _, POOL_CAPACITY>::new(
        SoftwareLinkSecurity::new(2, medium),
        ArrayNeighborTable::<POOL_CAPACITY>::new(),
        PreSharedNetworkSecret::new(secret),
        config.clone(),
        2,
        0x0002,
        WeakRng::new(2),
    );

    let mut alice_boot = BootstrapDriver::new(&config, 0);
    let mut bob_boot = BootstrapDriver::new(&config, 0);

    let mut now_ms = 0u64;
    let deadline_ms = u64::from(cli.rounds) * cli.round_duration_ms + 500;
    while now_ms < deadline_ms {
        alice_boot.tick(&mut alice, now_ms);
        bob_boot.tick(&mut bob, now_ms);
        while alice.poll_inbound(now_ms) {}
        while bob.poll_inbound(now_ms) {}
        alice.expire_neighbors(now_ms);
        bob.expire_neighbors(now_ms);
        now_ms += 10;
    }

    report("alice", &alice);
    report("bob", &bob);
    Ok(())
}

fn report<L, T, S, const N: usize>(name: &str, engine: &HandshakeEngine<L, T, S, N>)
where
    L: apkes_link::LinkSecurityModule,
    T: apkes_core::NeighborTable,
    S: apkes_core::SchemeProvider,
{
    for handle in engine.neighbors().handles() {
        let Some(n) = engine.neighbors().get(handle) else {
            continue;
        };
        let key_hex = n
            .pairwise_key
            .map(hex_encode)
            .unwrap_or_else(|| "<none>".to_string());
        tracing::info!(
            node = name,
            status = ?n.status,
            local_index = n.local_index,
            pairwise_key = %key_hex,
            "neighbor"
        );
    }
}

fn parse_secret(hex: &str) -> anyhow::Result<[u8; PAIRWISE_KEY_LEN]> {
    if hex.len() != PAIRWISE_KEY_LEN * 2 {
        anyhow::bail!(
            "network secret must be exactly {} hex characters, got {}",
            PAIRWISE_KEY_LEN * 2,
            hex.len()
        );
    }
    let mut out = [0u8; PAIRWISE_KEY_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)?;
    }
    Ok(out)
}

fn hex_encode(bytes: [u8; PAIRWISE_KEY_LEN]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
