use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Receives game results. Calls are fire-and-forget: implementations must
/// not block for long and have no way to fail the game.
pub trait GameRecorder: Send + Sync {
    fn on_win(&self, player: &str);

    fn on_loss(&self, player: &str);
}

/// Discards every result.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl GameRecorder for NoopRecorder {
    fn on_win(&self, _player: &str) {}

    fn on_loss(&self, _player: &str) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
}

/// In-memory win/loss table for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    tallies: Mutex<HashMap<String, Tally>>,
}

impl ScoreBoard {
    pub fn tally(&self, player: &str) -> Tally {
        self.tallies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player)
            .copied()
            .unwrap_or_default()
    }

    fn update(&self, player: &str, apply: impl FnOnce(&mut Tally)) {
        let mut tallies = self.tallies.lock().unwrap_or_else(PoisonError::into_inner);
        apply(tallies.entry(player.to_string()).or_default());
    }
}

impl GameRecorder for ScoreBoard {
    fn on_win(&self, player: &str) {
        self.update(player, |tally| tally.wins += 1);
    }

    fn on_loss(&self, player: &str) {
        self.update(player, |tally| tally.losses += 1);
    }
}
