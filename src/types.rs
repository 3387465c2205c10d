use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::SIZE;

/// Side of the board. White belongs to the player who created the game and
/// always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Row step of a man of this color.
    pub fn forward(self) -> i32 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    /// Row on which a man of this color is crowned.
    pub fn promotion_row(self) -> i32 {
        match self {
            Self::White => SIZE - 1,
            Self::Black => 0,
        }
    }

    /// Seat label used in the text protocol.
    pub fn seat(self) -> &'static str {
        match self {
            Self::White => "Player1",
            Self::Black => "Player2",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
        }
    }
}

/// A board coordinate: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Cell halfway between two squares a jump apart.
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2, (self.y + other.y) / 2)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// One occupied cell of a structured snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub color: Color,
    pub is_king: bool,
}

/// Coarse session lifecycle exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub player1_id: String,
    pub player2_id: Option<String>,
    /// `"Player1"` or `"Player2"`.
    pub current_turn: String,
    pub phase: Phase,
    pub winner_id: Option<String>,
}

/// Structured game state pushed to message-oriented clients.
///
/// `board` is indexed `[y][x]`; empty cells are `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub game_id: String,
    pub game_info: GameInfo,
    pub board: Vec<Vec<Option<CellView>>>,
}

/// What one accepted move did to the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub from: Position,
    pub to: Position,
    /// Squares emptied by the capture chain, in hop order.
    pub captured: Vec<Position>,
    pub promoted: bool,
}
