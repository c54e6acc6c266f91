use racewire_protocol::{BallState, CheatState, ClientDisconnected, LevelFinish, PlayerEntity};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::{DnfReason, PlayerRank, RankBatch, Roster};

/// Whether a race is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RaceState {
    Idle,
    Recording,
}

/// Follows one race and produces its standings.
///
/// Every operation is total: events for players not in the roster, or
/// events arriving while idle, simply have no effect. Operations that can
/// conclude a race return the [`RankBatch`] it produced.
#[derive(Debug)]
pub struct RaceTracker {
    state: RaceState,
    roster: Roster,
    rank_counter: u32,
    pending: Vec<PlayerRank>,
}

impl Default for RaceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceTracker {
    pub fn new() -> Self {
        Self {
            state: RaceState::Idle,
            roster: Roster::new(),
            rank_counter: 1,
            pending: Vec::new(),
        }
    }

    /// Starts a race with `players`.
    ///
    /// A race already in progress is stopped first; its batch is
    /// returned. Duplicate ids keep their first entry.
    pub fn start_record(
        &mut self,
        players: impl IntoIterator<Item = PlayerEntity>,
    ) -> Option<RankBatch> {
        let previous = self.stop_record();

        self.rank_counter = 1;
        for player in players {
            let id = player.id;
            if !self.roster.insert(player) {
                warn!(player_id = id, "duplicate player in start roster, ignored");
            }
        }
        self.state = RaceState::Recording;
        info!(players = self.roster.len(), "race started");

        previous
    }

    /// Ball positions are accepted while recording but not modeled.
    pub fn income_ball_state(&mut self, msg: &BallState) {
        if self.is_recording() {
            trace!(player_id = msg.player_id, "ball state");
        }
    }

    /// A player reporting `cheated != 0` is out with reason Cheat.
    pub fn income_cheat(&mut self, msg: &CheatState) -> Option<RankBatch> {
        if msg.cheated == 0 {
            return None;
        }
        self.terminate(msg.player_id, DnfReason::Cheat)
    }

    pub fn income_disconnect(&mut self, msg: &ClientDisconnected) -> Option<RankBatch> {
        self.terminate(msg.player_id, DnfReason::Logout)
    }

    /// The player takes the next finishing position.
    pub fn income_level_finish(&mut self, msg: &LevelFinish) -> Option<RankBatch> {
        self.terminate(msg.player_id, DnfReason::None)
    }

    /// Ends the race. Everyone still racing times out.
    ///
    /// Returns `None` if no race was in progress.
    pub fn stop_record(&mut self) -> Option<RankBatch> {
        if self.state == RaceState::Idle {
            return None;
        }
        self.state = RaceState::Idle;

        let timed_out = self
            .roster
            .drain()
            .map(|player| PlayerRank::dnf(player, DnfReason::Timeout));
        self.pending.extend(timed_out);

        let batch = RankBatch {
            ranks: std::mem::take(&mut self.pending),
        };
        info!(results = batch.len(), "race stopped");
        Some(batch)
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RaceState::Recording
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The finishing position the next finisher will get.
    pub fn rank_counter(&self) -> u32 {
        self.rank_counter
    }

    /// Results decided so far in the current race.
    pub fn pending(&self) -> &[PlayerRank] {
        &self.pending
    }

    fn terminate(&mut self, id: u32, reason: DnfReason) -> Option<RankBatch> {
        let Some(player) = self.roster.remove(id) else {
            trace!(player_id = id, "event for player not racing, ignored");
            return None;
        };

        let rank = match reason {
            DnfReason::None => {
                let index = self.rank_counter;
                self.rank_counter += 1;
                PlayerRank::finished(player, index)
            }
            reason => PlayerRank::dnf(player, reason),
        };
        debug!(
            player_id = rank.id,
            finish_index = rank.finish_index,
            reason = %rank.dnf_reason,
            "player terminated"
        );
        self.pending.push(rank);

        if self.roster.is_empty() {
            self.stop_record()
        } else {
            None
        }
    }
}
