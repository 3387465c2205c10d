//! Browser binding: a single local game running the same rules as the
//! server, for move highlighting and offline play.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::game::Game;
use crate::types::{BoardSnapshot, Color, GameInfo, Phase, Position};

/// One destination offered to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveHint {
    to: Position,
    is_jump: bool,
    captured: Vec<Position>,
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsError::new(&e.to_string()))
}

#[wasm_bindgen]
pub struct LocalGame {
    game: Game,
}

#[wasm_bindgen]
impl LocalGame {
    #[wasm_bindgen(constructor)]
    pub fn new() -> LocalGame {
        LocalGame { game: Game::new() }
    }

    /// Destinations the piece at `(x, y)` may move to now.
    #[wasm_bindgen(js_name = "legalMoves")]
    pub fn legal_moves(&self, x: i32, y: i32) -> Result<JsValue, JsError> {
        to_js(&self.hints(Position::new(x, y)))
    }

    /// Plays for the side to move and returns what changed.
    pub fn play(&mut self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> Result<JsValue, JsError> {
        let turn = self.game.turn();
        let record = self
            .game
            .play(turn, Position::new(from_x, from_y), Position::new(to_x, to_y))
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_js(&record)
    }

    pub fn snapshot(&self) -> Result<JsValue, JsError> {
        to_js(&self.board_snapshot())
    }

    /// `"white"` or `"black"`.
    pub fn turn(&self) -> String {
        self.game.turn().to_string()
    }

    #[wasm_bindgen(js_name = "isOver")]
    pub fn is_over(&self) -> bool {
        self.game.winner().is_some()
    }

    pub fn winner(&self) -> Option<String> {
        self.game.winner().map(|color| color.to_string())
    }
}

impl Default for LocalGame {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalGame {
    fn hints(&self, from: Position) -> Vec<MoveHint> {
        self.game
            .playable_moves(from)
            .iter()
            .map(|mv| MoveHint {
                to: mv.ending_position(),
                is_jump: mv.is_jump(),
                captured: mv.captured_positions(),
            })
            .collect()
    }

    fn board_snapshot(&self) -> BoardSnapshot {
        let winner = self.game.winner();
        BoardSnapshot {
            game_id: "local".to_string(),
            game_info: GameInfo {
                player1_id: Color::White.to_string(),
                player2_id: Some(Color::Black.to_string()),
                current_turn: self.game.turn().seat().to_string(),
                phase: if winner.is_some() { Phase::Ended } else { Phase::Active },
                winner_id: winner.map(|color| color.to_string()),
            },
            board: self.game.board().to_cells(),
        }
    }
}
