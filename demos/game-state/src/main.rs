//! Game state example binary
//!
//! Drives a [`GameStateStore`] from key presses. Keys come from the command
//! line (`game-state space h d`) or, when none are given, one per line from
//! stdin: `space` or a blank line scores 10, `h` heals, `d` dies, `q` quits.

use anyhow::Context;
use futures::StreamExt;
use game_state::{Command, GameState, GameStateStore, command_for_key, game_over_events, score_changes};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "game_state=info,unistate_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = GameStateStore::new().context("building game store")?;

    let _logger = store.subscribe(|state: &GameState| match serde_json::to_string(state) {
        Ok(json) => tracing::info!(state = %json, "State"),
        Err(error) => tracing::warn!(%error, "Could not serialise state"),
    })?;

    let game_over = tokio::spawn(game_over_events(store.stream()?).for_each(|health| async move {
        tracing::info!(health, "Game Over!");
    }));
    let scores = tokio::spawn(score_changes(store.stream()?).for_each(|score| async move {
        tracing::info!(score, "Score updated");
    }));

    let keys: Vec<String> = std::env::args().skip(1).collect();
    if keys.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("reading stdin")? {
            if !handle_key(&store, &line) {
                break;
            }
        }
    } else {
        for key in &keys {
            if !handle_key(&store, key) {
                break;
            }
        }
    }

    store.dispose()?;
    game_over.await.context("game over listener")?;
    scores.await.context("score listener")?;

    let last = store.current_state();
    println!("Final state: {}", serde_json::to_string_pretty(&last)?);
    Ok(())
}

/// Apply one key press. Returns `false` when the input loop should stop.
fn handle_key(store: &GameStateStore, key: &str) -> bool {
    match command_for_key(key) {
        Some(Command::Dispatch(action)) => {
            if let Err(error) = store.dispatch_boxed(action) {
                tracing::warn!(%error, "Action rejected");
            }
            true
        },
        Some(Command::Quit) => false,
        None => {
            tracing::debug!(key, "Ignoring unmapped key");
            true
        },
    }
}
