use racewire_protocol::DecodeError;

/// Errors that can occur in the transport layer.
///
/// Two classes matter to callers. Process-fatal errors (see
/// [`TransportError::is_process_fatal`]) go to the
/// [`FatalHandler`](crate::FatalHandler); the rest only tear down the
/// connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The single connect attempt failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a frame failed or timed out.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed (including a peer that hung up mid-frame).
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A frame header declared a length at or above the limit.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: u32, max: u32 },

    /// A frame arrived intact but its payload did not decode.
    #[error("malformed frame: {0}")]
    Decode(#[from] DecodeError),

    /// A message queue hit its hard limit.
    #[error("message queue overflow: {pending} messages pending")]
    CapacityExceeded { pending: usize },

    /// `start` was called on an engine that is already running.
    #[error("transport already started")]
    AlreadyStarted,
}

impl TransportError {
    /// `true` for failures that must terminate the process: connect,
    /// send, receive, and queue overflow. Oversized or malformed frames
    /// only cost the connection.
    pub fn is_process_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. }
                | Self::SendFailed(_)
                | Self::ReceiveFailed(_)
                | Self::CapacityExceeded { .. }
        )
    }
}
