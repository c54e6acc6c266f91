//! Race tracking for racewire.
//!
//! A [`RaceTracker`] follows one race at a time. It is started with the
//! server's current client list, consumes gameplay events as the
//! dispatcher routes them in, and hands back a [`RankBatch`] whenever a
//! race concludes. Turning that batch into chat lines is
//! [`RankBatch::into_chat_messages`].
//!
//! The tracker is plain data: no locks, no tasks. The dispatch loop owns
//! it exclusively.
//!
//! ```text
//!            start_record(players)
//!   Idle ─────────────────────────────▶ Recording
//!    ▲                                      │
//!    └── stop_record() / roster emptied ────┘  ⇒ RankBatch
//! ```

mod rank;
mod roster;
mod tracker;

pub use rank::{DnfReason, PlayerRank, RankBatch};
pub use roster::Roster;
pub use tracker::{RaceState, RaceTracker};
