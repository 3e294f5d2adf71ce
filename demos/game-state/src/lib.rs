//! # Game State Example
//!
//! A score/health game state demonstrating unistate.
//!
//! This example showcases:
//! - One action type per state transition
//! - Function and struct-style reducers
//! - A domain store type wrapping [`Store`]
//! - Deriving change notifications ("score changed", "game over") from the
//!   state stream with ordinary `futures` combinators
//!
//! ## Example
//!
//! ```no_run
//! use game_state::{GameStateStore, IncreaseHealth, UpdateScore};
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = GameStateStore::new()?;
//!
//! store.dispatch(UpdateScore(10))?;
//! store.dispatch(IncreaseHealth(1))?;
//! assert_eq!(store.with_state(|s| (s.score, s.health)), (10, 4));
//! # Ok(())
//! # }
//! ```

use futures::{Stream, StreamExt, future};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use unistate_core::action::{Action, AnyAction};
use unistate_core::error::ConfigurationError;
use unistate_core::reducer::{Reducer, ReducerMap};
use unistate_runtime::{Store, StoreConfig};

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current score
    pub score: i64,
    /// Remaining health; the game is over at zero or below
    pub health: i32,
}

impl GameState {
    /// Create a state with the given score and health.
    #[must_use]
    pub const fn new(score: i64, health: i32) -> Self {
        Self { score, health }
    }

    /// Whether the player has run out of health.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.health <= 0
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(0, 3)
    }
}

/// Set the score to an absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateScore(pub i64);
impl Action for UpdateScore {}

/// Add to health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncreaseHealth(pub i32);
impl Action for IncreaseHealth {}

/// Drop health to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Death;
impl Action for Death {}

/// Reducer for [`UpdateScore`].
#[must_use]
pub const fn update_score(state: &GameState, action: &UpdateScore) -> GameState {
    GameState {
        score: action.0,
        ..*state
    }
}

/// Reducer for [`IncreaseHealth`].
#[must_use]
pub const fn increase_health(state: &GameState, action: &IncreaseHealth) -> GameState {
    GameState {
        health: state.health.saturating_add(action.0),
        ..*state
    }
}

/// Reducer for [`Death`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeathReducer;

impl Reducer<GameState> for DeathReducer {
    type Action = Death;
    type Output = GameState;

    fn reduce(&self, state: &GameState, _action: &Death) -> GameState {
        GameState {
            health: 0,
            ..*state
        }
    }
}

/// All game reducers.
///
/// # Errors
///
/// Returns [`ConfigurationError`] if the reducer set is invalid.
pub fn game_reducers() -> Result<ReducerMap<GameState>, ConfigurationError> {
    ReducerMap::builder()
        .on(update_score)
        .on(increase_health)
        .with(DeathReducer)
        .build()
}

/// Store for [`GameState`], starting from `{ score: 0, health: 3 }`.
#[derive(Debug, Clone)]
pub struct GameStateStore {
    store: Store<GameState>,
}

impl GameStateStore {
    /// Create a store with the default game state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the reducer set is invalid.
    pub fn new() -> Result<Self, ConfigurationError> {
        Self::with_state(GameState::default())
    }

    /// Create a store starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the reducer set is invalid.
    pub fn with_state(initial: GameState) -> Result<Self, ConfigurationError> {
        let store = Store::with_config(initial, game_reducers()?, StoreConfig::new("game"))?;
        Ok(Self { store })
    }

    /// Unwrap into the generic Store.
    #[must_use]
    pub fn into_store(self) -> Store<GameState> {
        self.store
    }
}

impl Deref for GameStateStore {
    type Target = Store<GameState>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// What a key press asks the game to do.
#[derive(Debug)]
pub enum Command {
    /// Dispatch an action
    Dispatch(Box<dyn AnyAction>),
    /// Stop the input loop
    Quit,
}

/// Map a key name to a command: `space` or a blank line (including one of
/// only whitespace) scores 10, `h` heals 1, `d` kills, `q` quits. Unknown keys
/// yield `None`.
#[must_use]
pub fn command_for_key(key: &str) -> Option<Command> {
    match key.trim().to_ascii_lowercase().as_str() {
        "space" | "" => Some(Command::Dispatch(Box::new(UpdateScore(10)))),
        "h" => Some(Command::Dispatch(Box::new(IncreaseHealth(1)))),
        "d" => Some(Command::Dispatch(Box::new(Death))),
        "q" => Some(Command::Quit),
        _ => None,
    }
}

/// Drop consecutive repeats from a stream.
pub fn distinct_until_changed<St>(stream: St) -> impl Stream<Item = St::Item>
where
    St: Stream,
    St::Item: Clone + PartialEq,
{
    stream
        .scan(None, |last: &mut Option<St::Item>, item: St::Item| {
            let changed = last.as_ref() != Some(&item);
            *last = Some(item.clone());
            future::ready(Some(changed.then_some(item)))
        })
        .filter_map(future::ready)
}

/// Score values, emitted only when the score changes.
pub fn score_changes<St>(states: St) -> impl Stream<Item = i64>
where
    St: Stream<Item = GameState>,
{
    distinct_until_changed(states.map(|state| state.score))
}

/// Health values at or below zero, emitted when health changes to them.
pub fn game_over_events<St>(states: St) -> impl Stream<Item = i32>
where
    St: Stream<Item = GameState>,
{
    distinct_until_changed(states.map(|state| state.health))
        .filter(|health| future::ready(*health <= 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use unistate_testing::ReducerTest;

    #[allow(clippy::unwrap_used)]
    fn reducers() -> ReducerMap<GameState> {
        game_reducers().unwrap()
    }

    #[test]
    fn test_update_score() {
        ReducerTest::new(reducers())
            .given_state(GameState::default())
            .when_action(UpdateScore(10))
            .then_state(|state| {
                assert_eq!(*state, GameState::new(10, 3));
            })
            .run();
    }

    #[test]
    fn test_increase_health() {
        ReducerTest::new(reducers())
            .given_state(GameState::new(10, 3))
            .when_action(IncreaseHealth(1))
            .then_state(|state| {
                assert_eq!(*state, GameState::new(10, 4));
            })
            .run();
    }

    #[test]
    fn test_death() {
        ReducerTest::new(reducers())
            .given_state(GameState::new(25, 4))
            .when_action(Death)
            .then_state(|state| {
                assert!(state.is_game_over());
                assert_eq!(state.score, 25);
            })
            .run();
    }

    #[test]
    fn test_key_mapping() {
        assert!(matches!(command_for_key("q"), Some(Command::Quit)));
        assert!(command_for_key("x").is_none());

        for blank in ["", " ", "space"] {
            match command_for_key(blank) {
                Some(Command::Dispatch(action)) => {
                    assert_eq!(action.kind().name(), "UpdateScore");
                },
                other => unreachable!("unexpected command for {blank:?}: {other:?}"),
            }
        }

        match command_for_key(" H ") {
            Some(Command::Dispatch(action)) => {
                assert_eq!(action.kind().name(), "IncreaseHealth");
            },
            other => unreachable!("unexpected command: {other:?}"),
        }
    }
}
