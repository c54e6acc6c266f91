//! Length-prefixed framing.
//!
//! Every frame on the wire is a little-endian `u32` payload length
//! followed by exactly that many payload bytes.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Prepends the length prefix to `payload`.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Writes one frame, giving up after `timeout`.
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
    timeout: Duration,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload);
    match tokio::time::timeout(timeout, writer.write_all(&frame)).await {
        Ok(result) => result.map_err(TransportError::SendFailed),
        Err(_) => Err(TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "frame write timed out",
        ))),
    }
}

/// Reads one frame and returns its payload.
///
/// A declared length at or above `max` is rejected before any payload
/// byte is read.
pub async fn read_frame<R>(reader: &mut R, max: u32) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .await
        .map_err(TransportError::ReceiveFailed)?;

    let len = u32::from_le_bytes(header);
    if len >= max {
        return Err(TransportError::FrameTooLarge { len, max });
    }

    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(TransportError::ReceiveFailed)?;
    Ok(payload)
}
