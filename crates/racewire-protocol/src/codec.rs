//! Binary codec: little-endian primitives and the [`WireMessage`] trait.
//!
//! Every message on the wire has the same shape:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────┐
//! │ opcode (u32) │ variant fields, in fixed order   │
//! └──────────────┴──────────────────────────────────┘
//! ```
//!
//! Field encodings:
//!
//! - `u32`, `i32`, `f32` → 4 bytes, little-endian
//! - `u8`                → 1 raw byte
//! - string              → `u32` byte count, then that many raw bytes
//!   (no terminator, no escaping)
//!
//! There is no schema on the wire. Both sides must agree on the field
//! order for each opcode, which is why the order lives in exactly one
//! place: each variant's [`WireMessage`] impl.
//!
//! # Strings
//!
//! The protocol carries single-byte text. On decode every byte maps to the
//! `char` with the same code point (so arbitrary bytes never fail to
//! decode). On encode, chars above `U+00FF` have no single-byte form and
//! are written as `?`. For any string made of single-byte chars,
//! `decode(encode(s)) == s`.

use crate::{DecodeError, Message, OpCode};

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only byte buffer for encoding.
///
/// Writing never fails; the buffer just grows, so `encode` returns
/// `Vec<u8>` and not a `Result`.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a single raw byte.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Writes a little-endian `u32`.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian `i32`.
    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian IEEE-754 `f32`.
    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes the opcode tag.
    pub fn put_opcode(&mut self, opcode: OpCode) {
        self.put_u32(opcode.as_u32());
    }

    /// Writes a length-prefixed single-byte string.
    ///
    /// The prefix is the number of bytes written, which equals the number
    /// of chars (every char becomes exactly one byte).
    pub fn put_str(&mut self, value: &str) {
        let bytes: Vec<u8> = value
            .chars()
            .map(|c| u8::try_from(c).unwrap_or(b'?'))
            .collect();
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(&bytes);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Forward-only cursor over an immutable byte slice.
///
/// The cursor only ever moves forward and never looks past the field it
/// is currently reading. Each getter takes a `field` name that ends up
/// in the [`DecodeError`] if the read fails.
///
/// `'a` is the lifetime of the borrowed input: the reader can't outlive
/// the buffer it reads from.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let remaining = self.remaining();
        if remaining < N {
            return Err(DecodeError::Truncated {
                field,
                needed: N,
                remaining,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Reads a single raw byte.
    pub fn get_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        let [b] = self.take_array::<1>(field)?;
        Ok(b)
    }

    /// Reads a little-endian `u32`.
    pub fn get_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.take_array(field).map(u32::from_le_bytes)
    }

    /// Reads a little-endian `i32`.
    pub fn get_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        self.take_array(field).map(i32::from_le_bytes)
    }

    /// Reads a little-endian `f32`.
    pub fn get_f32(&mut self, field: &'static str) -> Result<f32, DecodeError> {
        self.take_array(field).map(f32::from_le_bytes)
    }

    /// Reads a length-prefixed single-byte string.
    pub fn get_str(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let declared = self.get_u32(field)? as usize;
        let remaining = self.remaining();
        if remaining < declared {
            return Err(DecodeError::StringTruncated {
                field,
                declared,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + declared];
        self.pos += declared;
        Ok(bytes.iter().map(|&b| char::from(b)).collect())
    }

    /// Reads the opcode tag and checks it against `expected`.
    pub fn expect_opcode(&mut self, expected: OpCode) -> Result<(), DecodeError> {
        let found = self.get_u32("opcode")?;
        if found != expected.as_u32() {
            return Err(DecodeError::OpCodeMismatch { expected, found });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WireMessage
// ---------------------------------------------------------------------------

/// A message variant with a fixed opcode and a fixed field layout.
///
/// Implementors only describe their *fields*; the opcode tag is handled
/// by the provided `encode`/`decode` methods. Variants that extend
/// another variant (e.g. `Chat` extends `OrderChat`) call the base's
/// `encode_fields`/`decode_fields` first, then handle their own fields.
pub trait WireMessage: Sized {
    /// The opcode tag that precedes this variant on the wire.
    const OPCODE: OpCode;

    /// Writes this variant's fields (without the opcode).
    fn encode_fields(&self, w: &mut Writer);

    /// Reads this variant's fields (the opcode has already been consumed).
    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError>;

    /// Encodes the opcode tag followed by the fields.
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_opcode(Self::OPCODE);
        self.encode_fields(&mut w);
        w.into_bytes()
    }

    /// Decodes bytes that must carry this variant's opcode.
    ///
    /// # Errors
    /// [`DecodeError::OpCodeMismatch`] if the tag belongs to another
    /// variant; `Truncated`/`StringTruncated` if the buffer runs out.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        r.expect_opcode(Self::OPCODE)?;
        Self::decode_fields(&mut r)
    }
}

/// Encodes any catalog message into a payload (opcode + fields).
pub fn encode(message: &Message) -> Vec<u8> {
    message.encode()
}

/// Decodes a payload into whichever catalog variant its opcode names.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    Message::decode(bytes)
}

/// Decodes a payload that must be of variant `T`.
///
/// ```rust
/// use racewire_protocol::{decode_as, ClientDisconnected, WireMessage};
///
/// let bytes = ClientDisconnected { player_id: 9 }.encode();
/// let msg: ClientDisconnected = decode_as(&bytes).unwrap();
/// assert_eq!(msg.player_id, 9);
/// ```
pub fn decode_as<T: WireMessage>(bytes: &[u8]) -> Result<T, DecodeError> {
    T::decode(bytes)
}
