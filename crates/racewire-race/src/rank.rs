use std::fmt;

use racewire_protocol::{Chat, Message, PlayerEntity};
use serde::Serialize;

/// Why a player did not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DnfReason {
    /// Finished normally.
    None,
    /// Reported a cheat state mid-race.
    Cheat,
    /// Disconnected mid-race.
    Logout,
    /// Still racing when the race was stopped.
    Timeout,
}

impl fmt::Display for DnfReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Cheat => "Cheat",
            Self::Logout => "Logout",
            Self::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}

/// One player's result. `finish_index` 0 means DNF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRank {
    pub id: u32,
    pub nickname: String,
    pub finish_index: u32,
    pub dnf_reason: DnfReason,
}

impl PlayerRank {
    pub fn finished(player: PlayerEntity, finish_index: u32) -> Self {
        Self {
            id: player.id,
            nickname: player.nickname,
            finish_index,
            dnf_reason: DnfReason::None,
        }
    }

    pub fn dnf(player: PlayerEntity, reason: DnfReason) -> Self {
        Self {
            id: player.id,
            nickname: player.nickname,
            finish_index: 0,
            dnf_reason: reason,
        }
    }

    pub fn is_finisher(&self) -> bool {
        self.finish_index != 0
    }

    /// The chat line announcing this result.
    pub fn render(&self) -> String {
        if self.is_finisher() {
            format!("{}: {}", self.nickname, self.finish_index)
        } else {
            format!("{}: DNF. Reason: {}", self.nickname, self.dnf_reason)
        }
    }
}

/// Every result of one race, in the order they were decided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankBatch {
    pub ranks: Vec<PlayerRank>,
}

impl RankBatch {
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlayerRank> {
        self.ranks.iter()
    }

    /// One server chat message per result, same order.
    pub fn into_chat_messages(self) -> Vec<Message> {
        self.ranks
            .iter()
            .map(|rank| Chat::broadcast(rank.render()).into())
            .collect()
    }
}

impl<'a> IntoIterator for &'a RankBatch {
    type Item = &'a PlayerRank;
    type IntoIter = std::slice::Iter<'a, PlayerRank>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u32, nickname: &str) -> PlayerEntity {
        PlayerEntity::new(id, nickname, 0)
    }

    #[test]
    fn test_finisher_renders_index() {
        let rank = PlayerRank::finished(player(1, "alice"), 2);
        assert_eq!(rank.render(), "alice: 2");
    }

    #[test]
    fn test_dnf_renders_reason() {
        let rank = PlayerRank::dnf(player(2, "bob"), DnfReason::Logout);
        assert_eq!(rank.render(), "bob: DNF. Reason: Logout");
        assert!(!rank.is_finisher());
    }

    #[test]
    fn test_batch_becomes_server_chats_in_order() {
        let batch = RankBatch {
            ranks: vec![
                PlayerRank::finished(player(1, "alice"), 1),
                PlayerRank::dnf(player(2, "bob"), DnfReason::Timeout),
            ],
        };
        let chats = batch.into_chat_messages();
        assert_eq!(
            chats,
            vec![
                Message::Chat(Chat::broadcast("alice: 1")),
                Message::Chat(Chat::broadcast("bob: DNF. Reason: Timeout")),
            ]
        );
    }

    #[test]
    fn test_batch_serializes_for_logging() {
        let batch = RankBatch {
            ranks: vec![PlayerRank::dnf(player(3, "cy"), DnfReason::Cheat)],
        };
        let json = serde_json::to_string(&batch).unwrap();
        assert_eq!(
            json,
            r#"{"ranks":[{"id":3,"nickname":"cy","finish_index":0,"dnf_reason":"Cheat"}]}"#
        );
    }
}
