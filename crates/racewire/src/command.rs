//! Console command parsing.
//!
//! Lines are split on spaces with empty tokens dropped. A leading `!sw`
//! addresses the race bot itself, a leading `/mmo` addresses server
//! moderation, and anything else is chat.

/// Orders under `!sw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOrder {
    /// `!sw` alone.
    Missing,
    /// `st`: count down 3, 2, 1, GO! then start recording.
    Start,
    /// `lst`: like `st` with a leading "Ready".
    ReadyStart,
    /// `fin`: stop recording now.
    Finish,
    /// `stop`: shut the bot down.
    Stop,
    /// `help` or anything unrecognised.
    Help,
}

/// Orders under `/mmo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOrder {
    /// `/mmo` alone.
    Missing,
    /// `cheat on|off`; `None` when the switch is missing or unrecognised.
    Cheat(Option<bool>),
    /// `kick <name>`; `None` when no name was given.
    Kick(Option<String>),
    /// `help` or anything unrecognised.
    Help,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    Race(RaceOrder),
    Moderation(ModerationOrder),
    /// Sent verbatim as server chat.
    Chat(String),
}

pub const RACE_INVALID: &str = "Invalid command. Type `!sw help` for help.";
pub const MODERATION_INVALID: &str = "Invalid command. Type `/mmo help` for help.";

pub const RACE_HELP: [&str; 5] = [
    "!sw st: Auto send 3,2,1,GO! And start recording.",
    "!sw lst: Auto send Ready,3,2,1,GO! And start recording.",
    "!sw fin: Stop record forcely.",
    "!sw stop: Disconnect and quit.",
    "!sw help: Show this help.",
];

pub const MODERATION_HELP: [&str; 3] = [
    "/mmo cheat on|off: Toggle cheat mode for everyone.",
    "/mmo kick <name>: Kick a player.",
    "/mmo help: Show this help.",
];

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split(' ').filter(|t| !t.is_empty());
        let Some(head) = tokens.next() else {
            return Self::Empty;
        };

        match head {
            "!sw" => Self::Race(match tokens.next() {
                None => RaceOrder::Missing,
                Some("st") => RaceOrder::Start,
                Some("lst") => RaceOrder::ReadyStart,
                Some("fin") => RaceOrder::Finish,
                Some("stop") => RaceOrder::Stop,
                Some(_) => RaceOrder::Help,
            }),
            "/mmo" => Self::Moderation(match tokens.next() {
                None => ModerationOrder::Missing,
                Some("cheat") => ModerationOrder::Cheat(match tokens.next() {
                    Some("on") => Some(true),
                    Some("off") => Some(false),
                    _ => None,
                }),
                Some("kick") => ModerationOrder::Kick(tokens.next().map(str::to_owned)),
                Some(_) => ModerationOrder::Help,
            }),
            _ => Self::Chat(line.to_owned()),
        }
    }
}
