//! # apkes-core
//!
//! The protocol core: the handshake engine, neighbor table, wait-timer
//! pool and bootstrap driver that together implement the Adaptable
//! Pairwise Key Establishment Scheme's HELLO/HELLOACK/ACK state machine.
//!
//! This crate owns no I/O. It depends on [`apkes_link::LinkSecurityModule`]
//! for frame transport and security, and on [`scheme::SchemeProvider`] for
//! the underlying key-exchange scheme, so it compiles and tests the same
//! whether those are backed by a radio and a certificate store or, as in
//! this workspace, the software reference implementations in
//! [`apkes_link::software`] and [`scheme::PreSharedNetworkSecret`].
//!
//! ## Module structure
//!
//! - [`config`]: runtime-tunable protocol parameters
//! - [`neighbor`]: the neighbor table and its lifecycle states
//! - [`codec`]: HELLO/HELLOACK/ACK wire encoding
//! - [`timer`]: the wait-timer pool and HELLOACK jitter
//! - [`scheme`]: the key-exchange scheme seam
//! - [`engine`]: the handshake state machine
//! - [`bootstrap`]: the fixed-round HELLO broadcast driver
//! - [`clock`]: the round clock abstraction `bootstrap` runs against
//! - [`error`]: error types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod clock;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod neighbor;
pub mod scheme;
pub mod timer;

pub use bootstrap::BootstrapDriver;
pub use clock::{ManualRoundClock, RoundClock, SystemRoundClock};
pub use config::ApkesConfig;
pub use engine::HandshakeEngine;
pub use error::{CodecError, CoreError};
pub use neighbor::{
    AntiReplayInfo, ArrayNeighborTable, Neighbor, NeighborHandle, NeighborIds, NeighborStatus,
    NeighborTable,
};
pub use scheme::{PreSharedNetworkSecret, SchemeProvider};
