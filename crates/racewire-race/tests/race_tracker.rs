//! Integration tests for the race tracker, driven the way the dispatcher
//! drives it: one decoded event at a time.

use racewire_protocol::{
    BallState, Chat, CheatState, ClientDisconnected, LevelFinish, Message, PlayerEntity,
};
use racewire_race::{DnfReason, RaceState, RaceTracker, RankBatch};

// =========================================================================
// Helpers
// =========================================================================

fn roster(ids: &[u32]) -> Vec<PlayerEntity> {
    ids.iter()
        .map(|&id| PlayerEntity::new(id, format!("P{id}"), 0))
        .collect()
}

fn finish(player_id: u32) -> LevelFinish {
    LevelFinish {
        player_id,
        points: 1000,
        time_elapsed: 61.5,
        current_level: 1,
        ..LevelFinish::default()
    }
}

fn cheat(player_id: u32, cheated: u8) -> CheatState {
    CheatState { player_id, cheated }
}

fn disconnect(player_id: u32) -> ClientDisconnected {
    ClientDisconnected { player_id }
}

fn summary(batch: &RankBatch) -> Vec<(u32, u32, DnfReason)> {
    batch
        .iter()
        .map(|r| (r.id, r.finish_index, r.dnf_reason))
        .collect()
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_everyone_finishes_auto_stops() {
    let mut t = RaceTracker::new();
    assert!(t.start_record(roster(&[1, 2])).is_none());

    assert!(t.income_level_finish(&finish(1)).is_none());
    let batch = t.income_level_finish(&finish(2)).expect("race concludes");

    assert_eq!(
        summary(&batch),
        vec![(1, 1, DnfReason::None), (2, 2, DnfReason::None)]
    );
    assert_eq!(t.state(), RaceState::Idle);
}

#[test]
fn test_disconnect_then_stop() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1, 2]));

    assert!(t.income_disconnect(&disconnect(1)).is_none());
    assert_eq!(t.roster().len(), 1);
    assert!(t.roster().contains(2));

    let batch = t.stop_record().expect("race was running");
    assert_eq!(
        summary(&batch),
        vec![(1, 0, DnfReason::Logout), (2, 0, DnfReason::Timeout)]
    );
    assert_eq!(t.state(), RaceState::Idle);
}

#[test]
fn test_lone_cheater_auto_stops() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1]));

    let batch = t.income_cheat(&cheat(1, 1)).expect("race concludes");
    assert_eq!(summary(&batch), vec![(1, 0, DnfReason::Cheat)]);
    assert_eq!(t.state(), RaceState::Idle);
}

#[test]
fn test_results_render_as_server_chat() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1, 2, 3]));
    t.income_level_finish(&finish(2));
    t.income_cheat(&cheat(3, 1));
    let batch = t.stop_record().unwrap();

    let lines: Vec<String> = batch
        .into_chat_messages()
        .into_iter()
        .map(|m| match m {
            Message::Chat(chat) => {
                assert_eq!(chat.player_id, Chat::SERVER_PLAYER_ID);
                chat.content().to_owned()
            }
            other => panic!("expected chat, got {other:?}"),
        })
        .collect();
    assert_eq!(
        lines,
        vec![
            "P2: 1".to_owned(),
            "P3: DNF. Reason: Cheat".to_owned(),
            "P1: DNF. Reason: Timeout".to_owned(),
        ]
    );
}

// =========================================================================
// Properties
// =========================================================================

#[test]
fn test_start_with_distinct_players_fills_roster() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[4, 8, 15, 16, 23, 42]));
    assert_eq!(t.roster().len(), 6);
    assert_eq!(t.rank_counter(), 1);
    assert!(t.is_recording());
}

#[test]
fn test_duplicate_ids_collapse_to_one_entry() {
    let mut t = RaceTracker::new();
    let mut players = roster(&[1, 2]);
    players.push(PlayerEntity::new(1, "impostor", 0));
    t.start_record(players);
    assert_eq!(t.roster().len(), 2);
    assert_eq!(t.roster().get(1).unwrap().nickname, "P1");
}

#[test]
fn test_sequential_finishes_rank_in_arrival_order() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[10, 20, 30, 40]));

    for id in [30, 10, 40] {
        assert!(t.income_level_finish(&finish(id)).is_none());
    }
    let ranks: Vec<(u32, u32)> = t.pending().iter().map(|r| (r.id, r.finish_index)).collect();
    assert_eq!(ranks, vec![(30, 1), (10, 2), (40, 3)]);
    assert_eq!(t.rank_counter(), 4);
}

#[test]
fn test_timeouts_follow_pending_results_in_roster_order() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1, 2, 3, 4, 5]));
    t.income_disconnect(&disconnect(3));
    t.income_level_finish(&finish(5));

    let batch = t.stop_record().unwrap();
    assert_eq!(
        summary(&batch),
        vec![
            (3, 0, DnfReason::Logout),
            (5, 1, DnfReason::None),
            (1, 0, DnfReason::Timeout),
            (2, 0, DnfReason::Timeout),
            (4, 0, DnfReason::Timeout),
        ]
    );
    assert!(t.roster().is_empty());
    assert!(t.pending().is_empty());
}

#[test]
fn test_clean_cheat_state_never_touches_roster() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1, 2]));
    let before = t.roster().clone();

    assert!(t.income_cheat(&cheat(1, 0)).is_none());
    assert_eq!(t.roster(), &before);
    assert!(t.pending().is_empty());
}

#[test]
fn test_unknown_player_events_are_noops() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1]));

    assert!(t.income_disconnect(&disconnect(7)).is_none());
    assert!(t.income_cheat(&cheat(7, 1)).is_none());
    assert!(t.income_level_finish(&finish(7)).is_none());
    assert_eq!(t.roster().len(), 1);
    assert!(t.is_recording());
}

#[test]
fn test_ball_state_is_accepted_without_effect() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1]));
    t.income_ball_state(&BallState {
        player_id: 1,
        ..BallState::default()
    });
    assert_eq!(t.roster().len(), 1);
    assert!(t.pending().is_empty());
}

#[test]
fn test_second_stop_emits_nothing() {
    let mut t = RaceTracker::new();
    t.start_record(roster(&[1]));
    assert!(t.stop_record().is_some());
    assert!(t.stop_record().is_none());
}

#[test]
fn test_empty_start_stops_with_empty_batch() {
    let mut t = RaceTracker::new();
    t.start_record(Vec::new());
    assert!(t.is_recording());
    let batch = t.stop_record().unwrap();
    assert!(batch.is_empty());
}
