//! Link-layer error types.

use thiserror::Error;

/// Errors raised by a [`crate::LinkSecurityModule`] implementation.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No frame is currently being built; `prepare_command_frame` was not
    /// called before `add_security_header`/`set_attr`/`send_command_frame`.
    #[error("no command frame in progress")]
    NoFrameInProgress,

    /// The destination is unreachable on the simulated medium (no such node).
    #[error("destination unreachable")]
    Unreachable,
}
