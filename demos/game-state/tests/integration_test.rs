//! Integration tests for the game state store
//!
//! These walk through the score/health scenarios end to end: dispatch,
//! late subscription, unknown actions and disposal.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Tests can unwrap

use futures::StreamExt;
use game_state::{
    Death, GameState, GameStateStore, IncreaseHealth, UpdateScore, game_over_events,
    score_changes,
};
use proptest::prelude::*;
use unistate_core::{Action, StoreError};
use unistate_testing::{Recorder, StoreHarness};

#[derive(Debug)]
struct Jump;
impl Action for Jump {}

#[test]
fn test_score_then_health() {
    let harness = StoreHarness::new(GameStateStore::new().unwrap().into_store());

    harness
        .dispatch(UpdateScore(10))
        .assert_state(|state| assert_eq!(*state, GameState::new(10, 3)))
        .dispatch(IncreaseHealth(1))
        .assert_state(|state| assert_eq!(*state, GameState::new(10, 4)));

    assert_eq!(
        harness.notifications(),
        vec![
            GameState::new(0, 3),
            GameState::new(10, 3),
            GameState::new(10, 4)
        ]
    );
}

#[test]
fn test_unknown_action_keeps_state() {
    let store = GameStateStore::new().unwrap();
    store.dispatch(UpdateScore(10)).unwrap();
    store.dispatch(IncreaseHealth(1)).unwrap();

    let err = store.dispatch(Jump).unwrap_err();

    assert!(matches!(err, StoreError::UnknownAction { .. }));
    assert_eq!(err.to_string(), "no reducer registered for action Jump");
    assert_eq!(store.current_state(), GameState::new(10, 4));
}

#[test]
fn test_late_subscriber_sees_latest_state_first() {
    let store = GameStateStore::new().unwrap();
    store.dispatch(UpdateScore(10)).unwrap();
    store.dispatch(IncreaseHealth(1)).unwrap();

    let recorder = Recorder::attach(&store.state_changes()).unwrap();
    assert_eq!(recorder.first(), Some(GameState::new(10, 4)));
    assert_eq!(recorder.len(), 1);
}

#[test]
fn test_dispose_stops_everything() {
    let store = GameStateStore::new().unwrap();
    let recorder = Recorder::attach(&store.state_changes()).unwrap();

    store.dispose().unwrap();
    let err = store.dispatch(UpdateScore(99)).unwrap_err();

    assert!(matches!(err, StoreError::Lifecycle(_)));
    assert_eq!(recorder.values(), vec![GameState::new(0, 3)]);
    assert_eq!(store.current_state(), GameState::new(0, 3));
}

#[tokio::test]
async fn test_derived_notifications() {
    let store = GameStateStore::new().unwrap();
    let scores = score_changes(store.stream().unwrap());
    let game_overs = game_over_events(store.stream().unwrap());

    store.dispatch(UpdateScore(10)).unwrap();
    store.dispatch(UpdateScore(10)).unwrap();
    store.dispatch(IncreaseHealth(1)).unwrap();
    store.dispatch(Death).unwrap();
    store.dispatch(Death).unwrap();
    store.dispatch(UpdateScore(20)).unwrap();
    store.dispose().unwrap();

    assert_eq!(scores.collect::<Vec<_>>().await, vec![0, 10, 20]);
    assert_eq!(game_overs.collect::<Vec<_>>().await, vec![0]);
}

#[tokio::test]
async fn test_boxed_key_commands() {
    let store = GameStateStore::new().unwrap();
    for key in ["space", "h", "h", "d"] {
        match game_state::command_for_key(key).expect("mapped key") {
            game_state::Command::Dispatch(action) => store.dispatch_boxed(action).unwrap(),
            game_state::Command::Quit => unreachable!("no quit key in this script"),
        }
    }

    assert_eq!(store.current_state(), GameState::new(10, 0));
}

proptest! {
    #[test]
    fn health_is_sum_of_increases(increases in prop::collection::vec(-5..5_i32, 0..32)) {
        let store = GameStateStore::new().unwrap();
        for amount in &increases {
            store.dispatch(IncreaseHealth(*amount)).unwrap();
        }

        let expected = 3 + increases.iter().sum::<i32>();
        prop_assert_eq!(store.with_state(|s| s.health), expected);
        prop_assert_eq!(store.with_state(|s| s.score), 0);
    }
}
