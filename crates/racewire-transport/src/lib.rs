//! Framed TCP client engine for racewire.
//!
//! A [`TcpClient`] owns one connection to the race server and three
//! background workers:
//!
//! - the **connector** makes a single connection attempt and asks the
//!   server for its client list,
//! - the **sender** drains the outbound queue every tick and writes one
//!   frame per message,
//! - the **receiver** reads frames, decodes them, and appends them to the
//!   inbound queue.
//!
//! Producers only ever touch the queues, so enqueuing never blocks on the
//! network. Failures that must end the process are routed to a
//! [`FatalHandler`].

mod config;
mod error;
mod fatal;
mod frame;
mod queue;
mod shutdown;
mod tcp;

pub use config::ClientConfig;
pub use error::TransportError;
pub use fatal::{ExitProcess, FatalHandler};
pub use frame::{HEADER_LEN, encode_frame, read_frame, write_frame};
pub use queue::{MessageQueue, Watermarks};
pub use shutdown::{ShutdownSignal, ShutdownTrigger, shutdown_channel};
pub use tcp::TcpClient;

use std::fmt;

use serde::Serialize;

/// Lifecycle of a [`TcpClient`]. States only ever move forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
