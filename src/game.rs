use std::rc::Rc;

use tracing::debug;

use crate::board::Board;
use crate::error::MoveError;
use crate::moves::Move;
use crate::types::{Color, MoveRecord, Position};

/// Rules state of one game: the board, whose turn it is and how many moves
/// have been accepted. Knows nothing about players or connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Color,
    moves_played: u32,
}

impl Game {
    pub fn new() -> Self {
        Self::from_board(Board::new(), Color::White)
    }

    pub fn from_board(board: Board, turn: Color) -> Self {
        Self {
            board,
            turn,
            moves_played: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn moves_played(&self) -> u32 {
        self.moves_played
    }

    /// Whether any piece of `color` has a capture available.
    pub fn has_jumps(&self, color: Color) -> bool {
        self.board.pieces_of(color).any(|piece| {
            piece
                .all_possible_moves(&self.board)
                .iter()
                .any(|mv| mv.is_jump())
        })
    }

    /// Moves `play` would accept from `from` right now: the side to move,
    /// captures only when one is available anywhere, first chain per
    /// destination.
    pub fn playable_moves(&self, from: Position) -> Vec<Rc<Move>> {
        let Some(piece) = self.board.piece_at(from) else {
            return Vec::new();
        };
        if piece.color() != self.turn {
            return Vec::new();
        }

        let must_jump = self.has_jumps(self.turn);
        let mut seen = Vec::new();
        piece
            .all_possible_moves(&self.board)
            .into_iter()
            .filter(|mv| {
                if seen.contains(&mv.ending_position()) {
                    return false;
                }
                seen.push(mv.ending_position());
                mv.is_jump() || !must_jump
            })
            .collect()
    }

    /// Validates and applies a move by `color`.
    ///
    /// Checks run in order: turn, bounds, a piece of `color` on `from`, `to`
    /// among that piece's moves (first match wins), forced capture. The board
    /// is only touched once every check has passed.
    pub fn play(&mut self, color: Color, from: Position, to: Position) -> Result<MoveRecord, MoveError> {
        if color != self.turn {
            return Err(MoveError::NotYourTurn {
                expected: self.turn,
            });
        }
        if Board::is_over_edge(from.x, from.y) || Board::is_over_edge(to.x, to.y) {
            return Err(MoveError::OutOfBounds { from, to });
        }

        let piece = *self
            .board
            .piece_at(from)
            .ok_or(MoveError::NoPiece { at: from })?;
        if piece.color() != color {
            return Err(MoveError::WrongColor { at: from });
        }

        let chosen = piece
            .all_possible_moves(&self.board)
            .into_iter()
            .find(|mv| mv.ending_position() == to)
            .ok_or(MoveError::IllegalDestination { from, to })?;

        if !chosen.is_jump() && self.has_jumps(color) {
            return Err(MoveError::CaptureRequired);
        }

        debug!(%chosen, %color, "applying move");
        let record = self.board.apply_move(&chosen);
        self.turn = self.turn.opponent();
        self.moves_played += 1;
        Ok(record)
    }

    /// Returns `(white_count, black_count)`.
    pub fn piece_counts(&self) -> (usize, usize) {
        self.board.counts()
    }

    /// The color left holding pieces once the other side has none.
    pub fn winner(&self) -> Option<Color> {
        match self.piece_counts() {
            (0, _) => Some(Color::Black),
            (_, 0) => Some(Color::White),
            _ => None,
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
