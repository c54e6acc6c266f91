//! # racewire
//!
//! A bot that sits on a racing-coordination server, watches the gameplay event stream, and
//! announces race standings in chat.
//!
//! The crate ties the layers together:
//!
//! ```text
//! TcpClient (receiver) → Dispatcher → RaceTracker
//!                                  ↘ RankBatch → chat → TcpClient (sender)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use racewire::prelude::*;
//!
//! # async fn run() -> Result<(), BotError> {
//! let bot = Bot::start(BotConfig::default(), Arc::new(ExitProcess));
//! bot.execute(Command::parse("!sw st"))?;
//! bot.shutdown().await
//! # }
//! ```

mod bot;
mod command;
mod config;
pub mod console;
mod dispatcher;
mod error;

pub use bot::{Bot, Reply};
pub use command::{Command, ModerationOrder, RaceOrder};
pub use config::BotConfig;
pub use console::ConsoleExit;
pub use dispatcher::{Control, Dispatcher, run as run_dispatcher};
pub use error::BotError;

pub mod prelude {
    pub use crate::{Bot, BotConfig, BotError, Command, ConsoleExit, Reply};
    pub use racewire_protocol::{Message, OpCode};
    pub use racewire_race::{DnfReason, PlayerRank, RankBatch};
    pub use racewire_transport::{
        ClientConfig, ConnectionState, ExitProcess, FatalHandler, TransportError,
    };
}
