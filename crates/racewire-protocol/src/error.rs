//! Error types for the protocol layer.
//!
//! Encoding cannot fail: every field has a fixed layout and strings are
//! written with whatever length they have. Decoding can, and each way it
//! can fail gets its own variant so the receiver can log exactly what was
//! wrong with a frame before tearing the connection down.

use crate::OpCode;

/// Errors produced while decoding a message from bytes.
///
/// None of these are recoverable at the protocol level; the decoder
/// never backtracks or skips ahead, so once a field fails to read the
/// rest of the buffer is meaningless.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Not enough bytes left for a fixed-width field (`u8`, `u32`,
    /// `i32`, `f32`, or a string's length prefix).
    #[error("truncated {field}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// A string's length prefix promised more bytes than the buffer holds.
    #[error(
        "truncated string {field}: declared {declared} bytes, {remaining} remaining"
    )]
    StringTruncated {
        field: &'static str,
        declared: usize,
        remaining: usize,
    },

    /// The opcode tag is valid but belongs to a different variant than
    /// the one the call site asked for.
    #[error("opcode mismatch: expected {expected}, found {found}")]
    OpCodeMismatch { expected: OpCode, found: u32 },

    /// The opcode tag is not part of the catalog at all.
    #[error("unknown opcode {0}")]
    UnknownOpCode(u32),
}
