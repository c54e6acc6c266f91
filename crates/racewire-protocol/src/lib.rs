//! Wire protocol for racewire.
//!
//! This crate defines the "language" the bot and the race server speak:
//!
//! - **Types** ([`Message`], [`OpCode`], one struct per variant): the
//!   closed catalog of messages that travel on the wire.
//! - **Codec** ([`WireMessage`], [`Reader`], [`Writer`], [`encode`],
//!   [`decode`]): how those messages are converted to/from bytes.
//! - **Errors** ([`DecodeError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer is pure: no sockets, no threads, no clocks. It sits
//! between the transport (framed bytes) and the race logic (typed events).
//!
//! ```text
//! Transport (frames) → Protocol (Message) → Dispatcher → Race tracker
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Reader, WireMessage, Writer, decode, decode_as, encode};
pub use error::DecodeError;
pub use types::{
    BallState, Chat, CheatState, ClientConnected, ClientDisconnected, ClientList, GlobalCheat,
    LevelFinish, Message, OpCode, OrderChat, OrderClientList, OrderGlobalCheat, PlayerEntity,
    Quaternion, Vector3,
};
