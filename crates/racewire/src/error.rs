//! Unified error type for the racewire bot.

use racewire_protocol::DecodeError;
use racewire_transport::TransportError;

/// Top-level error wrapping the per-crate errors.
///
/// `#[from]` on each wrapped variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// A transport-level error (connect, send, receive, overflow).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload that did not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The dispatch loop has already exited.
    #[error("dispatcher is no longer running")]
    DispatcherGone,
}
