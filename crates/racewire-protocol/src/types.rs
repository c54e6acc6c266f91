//! The message catalog: every type that travels on the wire.
//!
//! Direction is part of each name's meaning:
//!
//! - `Order*` variants go client → server ("please do X").
//! - The rest go server → client ("X happened").
//!
//! Several server variants *extend* a client order: `Chat` is an
//! `OrderChat` plus the sender's id, `GlobalCheat` is an
//! `OrderGlobalCheat` plus the player who toggled it, and `ClientList` is
//! an `OrderClientList` plus the roster. In Rust that's field composition:
//! the derived struct holds the base struct in a `base` field and encodes
//! it first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{Reader, WireMessage, Writer};
use crate::DecodeError;

// ---------------------------------------------------------------------------
// OpCode
// ---------------------------------------------------------------------------

/// Stable numeric tag identifying a message variant.
///
/// `#[repr(u32)]` pins each variant to the given discriminant so
/// `opcode as u32` is exactly what goes on the wire. Value 0 is reserved
/// and never decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum OpCode {
    OrderChat = 1,
    Chat = 2,
    OrderGlobalCheat = 3,
    OrderClientList = 4,
    ClientList = 5,
    BallState = 6,
    ClientConnected = 7,
    ClientDisconnected = 8,
    CheatState = 9,
    GlobalCheat = 10,
    LevelFinish = 11,
}

impl OpCode {
    /// The wire value of this opcode.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for OpCode {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::OrderChat,
            2 => Self::Chat,
            3 => Self::OrderGlobalCheat,
            4 => Self::OrderClientList,
            5 => Self::ClientList,
            6 => Self::BallState,
            7 => Self::ClientConnected,
            8 => Self::ClientDisconnected,
            9 => Self::CheatState,
            10 => Self::GlobalCheat,
            11 => Self::LevelFinish,
            other => return Err(DecodeError::UnknownOpCode(other)),
        })
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_u32())
    }
}

// ---------------------------------------------------------------------------
// Shared structures
// ---------------------------------------------------------------------------

/// A player as the server describes them. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerEntity {
    pub id: u32,
    pub nickname: String,
    /// Non-zero when the player has cheat mode enabled.
    pub cheated: u8,
}

impl PlayerEntity {
    /// Creates a player entity.
    pub fn new(id: u32, nickname: impl Into<String>, cheated: u8) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            cheated,
        }
    }

    fn write(&self, w: &mut Writer) {
        w.put_u32(self.id);
        w.put_str(&self.nickname);
        w.put_u8(self.cheated);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: r.get_u32("player.id")?,
            nickname: r.get_str("player.nickname")?,
            cheated: r.get_u8("player.cheated")?,
        })
    }
}

/// Smallest encoded size of a [`PlayerEntity`] (empty nickname).
const MIN_PLAYER_SIZE: usize = 4 + 4 + 1;

/// A position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Client → Server: "say this in chat".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderChat {
    pub content: String,
}

impl WireMessage for OrderChat {
    const OPCODE: OpCode = OpCode::OrderChat;

    fn encode_fields(&self, w: &mut Writer) {
        w.put_str(&self.content);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            content: r.get_str("content")?,
        })
    }
}

/// Server → Client: a chat line and who said it.
///
/// Player id 0 is the server itself; the bot uses it for everything it
/// broadcasts (see [`Chat::broadcast`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chat {
    pub base: OrderChat,
    pub player_id: u32,
}

impl Chat {
    /// Player id used for server-originated chat.
    pub const SERVER_PLAYER_ID: u32 = 0;

    /// Creates a chat line attributed to the server.
    pub fn broadcast(content: impl Into<String>) -> Self {
        Self {
            base: OrderChat {
                content: content.into(),
            },
            player_id: Self::SERVER_PLAYER_ID,
        }
    }

    /// The chat text.
    pub fn content(&self) -> &str {
        &self.base.content
    }
}

impl WireMessage for Chat {
    const OPCODE: OpCode = OpCode::Chat;

    fn encode_fields(&self, w: &mut Writer) {
        self.base.encode_fields(w);
        w.put_u32(self.player_id);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let base = OrderChat::decode_fields(r)?;
        Ok(Self {
            base,
            player_id: r.get_u32("player_id")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Global cheat
// ---------------------------------------------------------------------------

/// Client → Server: turn cheat mode on (`1`) or off (`0`) for everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderGlobalCheat {
    pub cheated: u8,
}

impl WireMessage for OrderGlobalCheat {
    const OPCODE: OpCode = OpCode::OrderGlobalCheat;

    fn encode_fields(&self, w: &mut Writer) {
        w.put_u8(self.cheated);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            cheated: r.get_u8("cheated")?,
        })
    }
}

/// Server → Client: a player toggled global cheat mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlobalCheat {
    pub base: OrderGlobalCheat,
    pub player_id: u32,
}

impl WireMessage for GlobalCheat {
    const OPCODE: OpCode = OpCode::GlobalCheat;

    fn encode_fields(&self, w: &mut Writer) {
        self.base.encode_fields(w);
        w.put_u32(self.player_id);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let base = OrderGlobalCheat::decode_fields(r)?;
        Ok(Self {
            base,
            player_id: r.get_u32("player_id")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Client list
// ---------------------------------------------------------------------------

/// Client → Server: "who is online?". No fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderClientList;

impl WireMessage for OrderClientList {
    const OPCODE: OpCode = OpCode::OrderClientList;

    fn encode_fields(&self, _w: &mut Writer) {}

    fn decode_fields(_r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self)
    }
}

/// Server → Client: everyone currently online.
///
/// On the wire the roster is a `u32` count followed by that many
/// `{id, nickname, cheated}` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientList {
    pub base: OrderClientList,
    pub players: Vec<PlayerEntity>,
}

impl WireMessage for ClientList {
    const OPCODE: OpCode = OpCode::ClientList;

    fn encode_fields(&self, w: &mut Writer) {
        self.base.encode_fields(w);
        w.put_u32(self.players.len() as u32);
        for player in &self.players {
            player.write(w);
        }
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let base = OrderClientList::decode_fields(r)?;
        let count = r.get_u32("players.len")? as usize;
        // The count comes from the peer; never reserve more than the
        // remaining bytes could possibly hold.
        let mut players = Vec::with_capacity(count.min(r.remaining() / MIN_PLAYER_SIZE));
        for _ in 0..count {
            players.push(PlayerEntity::read(r)?);
        }
        Ok(Self { base, players })
    }
}

// ---------------------------------------------------------------------------
// Gameplay events
// ---------------------------------------------------------------------------

/// Server → Client: one player's ball transform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BallState {
    pub player_id: u32,
    /// Ball material (wood, stone, paper...). Opaque to the bot.
    pub ball_type: u32,
    pub position: Vector3,
    pub rotation: Quaternion,
}

impl WireMessage for BallState {
    const OPCODE: OpCode = OpCode::BallState;

    fn encode_fields(&self, w: &mut Writer) {
        w.put_u32(self.player_id);
        w.put_u32(self.ball_type);
        w.put_f32(self.position.x);
        w.put_f32(self.position.y);
        w.put_f32(self.position.z);
        w.put_f32(self.rotation.x);
        w.put_f32(self.rotation.y);
        w.put_f32(self.rotation.z);
        w.put_f32(self.rotation.w);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            player_id: r.get_u32("player_id")?,
            ball_type: r.get_u32("ball_type")?,
            position: Vector3 {
                x: r.get_f32("position.x")?,
                y: r.get_f32("position.y")?,
                z: r.get_f32("position.z")?,
            },
            rotation: Quaternion {
                x: r.get_f32("rotation.x")?,
                y: r.get_f32("rotation.y")?,
                z: r.get_f32("rotation.z")?,
                w: r.get_f32("rotation.w")?,
            },
        })
    }
}

/// Server → Client: a player joined the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConnected {
    pub player: PlayerEntity,
}

impl WireMessage for ClientConnected {
    const OPCODE: OpCode = OpCode::ClientConnected;

    fn encode_fields(&self, w: &mut Writer) {
        self.player.write(w);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            player: PlayerEntity::read(r)?,
        })
    }
}

/// Server → Client: a player left the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDisconnected {
    pub player_id: u32,
}

impl WireMessage for ClientDisconnected {
    const OPCODE: OpCode = OpCode::ClientDisconnected;

    fn encode_fields(&self, w: &mut Writer) {
        w.put_u32(self.player_id);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            player_id: r.get_u32("player_id")?,
        })
    }
}

/// Server → Client: a single player's cheat flag changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheatState {
    pub player_id: u32,
    pub cheated: u8,
}

impl WireMessage for CheatState {
    const OPCODE: OpCode = OpCode::CheatState;

    fn encode_fields(&self, w: &mut Writer) {
        w.put_u32(self.player_id);
        w.put_u8(self.cheated);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            player_id: r.get_u32("player_id")?,
            cheated: r.get_u8("cheated")?,
        })
    }
}

/// Server → Client: a player reached the end of the level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelFinish {
    pub player_id: u32,
    pub points: i32,
    pub lifes: i32,
    pub life_bonus: i32,
    pub level_bonus: i32,
    /// Seconds since the level started.
    pub time_elapsed: f32,
    pub start_points: i32,
    pub current_level: i32,
    pub cheated: u8,
}

impl WireMessage for LevelFinish {
    const OPCODE: OpCode = OpCode::LevelFinish;

    fn encode_fields(&self, w: &mut Writer) {
        w.put_u32(self.player_id);
        w.put_i32(self.points);
        w.put_i32(self.lifes);
        w.put_i32(self.life_bonus);
        w.put_i32(self.level_bonus);
        w.put_f32(self.time_elapsed);
        w.put_i32(self.start_points);
        w.put_i32(self.current_level);
        w.put_u8(self.cheated);
    }

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            player_id: r.get_u32("player_id")?,
            points: r.get_i32("points")?,
            lifes: r.get_i32("lifes")?,
            life_bonus: r.get_i32("life_bonus")?,
            level_bonus: r.get_i32("level_bonus")?,
            time_elapsed: r.get_f32("time_elapsed")?,
            start_points: r.get_i32("start_points")?,
            current_level: r.get_i32("current_level")?,
            cheated: r.get_u8("cheated")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Message: the closed set
// ---------------------------------------------------------------------------

/// Any message in the catalog, tagged by variant.
///
/// This is what the transport queues carry. `match` on it to route by
/// opcode; the compiler makes sure every variant is handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    OrderChat(OrderChat),
    Chat(Chat),
    OrderGlobalCheat(OrderGlobalCheat),
    GlobalCheat(GlobalCheat),
    OrderClientList(OrderClientList),
    ClientList(ClientList),
    BallState(BallState),
    ClientConnected(ClientConnected),
    ClientDisconnected(ClientDisconnected),
    CheatState(CheatState),
    LevelFinish(LevelFinish),
}

impl Message {
    /// The opcode this message is tagged with on the wire.
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::OrderChat(_) => OpCode::OrderChat,
            Self::Chat(_) => OpCode::Chat,
            Self::OrderGlobalCheat(_) => OpCode::OrderGlobalCheat,
            Self::GlobalCheat(_) => OpCode::GlobalCheat,
            Self::OrderClientList(_) => OpCode::OrderClientList,
            Self::ClientList(_) => OpCode::ClientList,
            Self::BallState(_) => OpCode::BallState,
            Self::ClientConnected(_) => OpCode::ClientConnected,
            Self::ClientDisconnected(_) => OpCode::ClientDisconnected,
            Self::CheatState(_) => OpCode::CheatState,
            Self::LevelFinish(_) => OpCode::LevelFinish,
        }
    }

    /// Encodes the opcode tag followed by the variant's fields.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::OrderChat(m) => m.encode(),
            Self::Chat(m) => m.encode(),
            Self::OrderGlobalCheat(m) => m.encode(),
            Self::GlobalCheat(m) => m.encode(),
            Self::OrderClientList(m) => m.encode(),
            Self::ClientList(m) => m.encode(),
            Self::BallState(m) => m.encode(),
            Self::ClientConnected(m) => m.encode(),
            Self::ClientDisconnected(m) => m.encode(),
            Self::CheatState(m) => m.encode(),
            Self::LevelFinish(m) => m.encode(),
        }
    }

    /// Reads the opcode tag and decodes the matching variant.
    ///
    /// Bytes after the last field are not inspected.
    ///
    /// # Errors
    /// [`DecodeError::UnknownOpCode`] for a tag outside the catalog,
    /// otherwise whatever the variant's field decoding reports.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        let opcode = OpCode::try_from(r.get_u32("opcode")?)?;
        let r = &mut r;
        Ok(match opcode {
            OpCode::OrderChat => Self::OrderChat(OrderChat::decode_fields(r)?),
            OpCode::Chat => Self::Chat(Chat::decode_fields(r)?),
            OpCode::OrderGlobalCheat => Self::OrderGlobalCheat(OrderGlobalCheat::decode_fields(r)?),
            OpCode::GlobalCheat => Self::GlobalCheat(GlobalCheat::decode_fields(r)?),
            OpCode::OrderClientList => Self::OrderClientList(OrderClientList::decode_fields(r)?),
            OpCode::ClientList => Self::ClientList(ClientList::decode_fields(r)?),
            OpCode::BallState => Self::BallState(BallState::decode_fields(r)?),
            OpCode::ClientConnected => Self::ClientConnected(ClientConnected::decode_fields(r)?),
            OpCode::ClientDisconnected => {
                Self::ClientDisconnected(ClientDisconnected::decode_fields(r)?)
            }
            OpCode::CheatState => Self::CheatState(CheatState::decode_fields(r)?),
            OpCode::LevelFinish => Self::LevelFinish(LevelFinish::decode_fields(r)?),
        })
    }
}

impl From<OrderChat> for Message {
    fn from(m: OrderChat) -> Self {
        Self::OrderChat(m)
    }
}

impl From<Chat> for Message {
    fn from(m: Chat) -> Self {
        Self::Chat(m)
    }
}

impl From<OrderGlobalCheat> for Message {
    fn from(m: OrderGlobalCheat) -> Self {
        Self::OrderGlobalCheat(m)
    }
}

impl From<GlobalCheat> for Message {
    fn from(m: GlobalCheat) -> Self {
        Self::GlobalCheat(m)
    }
}

impl From<OrderClientList> for Message {
    fn from(m: OrderClientList) -> Self {
        Self::OrderClientList(m)
    }
}

impl From<ClientList> for Message {
    fn from(m: ClientList) -> Self {
        Self::ClientList(m)
    }
}

impl From<BallState> for Message {
    fn from(m: BallState) -> Self {
        Self::BallState(m)
    }
}

impl From<ClientConnected> for Message {
    fn from(m: ClientConnected) -> Self {
        Self::ClientConnected(m)
    }
}

impl From<ClientDisconnected> for Message {
    fn from(m: ClientDisconnected) -> Self {
        Self::ClientDisconnected(m)
    }
}

impl From<CheatState> for Message {
    fn from(m: CheatState) -> Self {
        Self::CheatState(m)
    }
}

impl From<LevelFinish> for Message {
    fn from(m: LevelFinish) -> Self {
        Self::LevelFinish(m)
    }
}

// =========================================================================
// Tests
// =========================================================================
