use std::fmt;
use std::rc::Rc;

use crate::board::Board;
use crate::piece::Piece;
use crate::types::Position;

/// One hop of a move.
///
/// Jump hops link back to the hop before them, so a multi-jump is the last
/// hop of a chain whose earlier hops are shared with the shorter candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    origin: Position,
    end: Position,
    previous: Option<Rc<Move>>,
    jump: bool,
}

impl Move {
    pub fn new(origin: Position, end: Position, previous: Option<Rc<Move>>, jump: bool) -> Self {
        Self {
            origin,
            end,
            previous,
            jump,
        }
    }

    /// A plain one-square diagonal move.
    pub fn step(origin: Position, end: Position) -> Self {
        Self::new(origin, end, None, false)
    }

    /// Square the moving piece started the whole chain from.
    pub fn starting_position(&self) -> Position {
        self.origin
    }

    pub fn ending_position(&self) -> Position {
        self.end
    }

    pub fn previous(&self) -> Option<&Rc<Move>> {
        self.previous.as_ref()
    }

    pub fn is_jump(&self) -> bool {
        self.jump
    }

    /// Square this particular hop departs from.
    pub fn hop_start(&self) -> Position {
        self.previous.as_ref().map_or(self.origin, |prev| prev.end)
    }

    /// Hops from the first one to `self`.
    pub fn chain(&self) -> Vec<&Move> {
        let mut hops = vec![self];
        let mut cursor = self.previous.as_deref();
        while let Some(hop) = cursor {
            hops.push(hop);
            cursor = hop.previous.as_deref();
        }
        hops.reverse();
        hops
    }

    /// Squares the piece passes through: origin, then every landing square.
    pub fn path(&self) -> Vec<Position> {
        let hops = self.chain();
        let mut path = Vec::with_capacity(hops.len() + 1);
        path.push(self.origin);
        path.extend(hops.iter().map(|hop| hop.end));
        path
    }

    /// Squares jumped over by the chain, first hop first.
    pub fn captured_positions(&self) -> Vec<Position> {
        self.chain()
            .into_iter()
            .filter(|hop| hop.jump)
            .map(|hop| hop.hop_start().midpoint(hop.end))
            .collect()
    }

    /// Pieces currently standing on the captured squares.
    pub fn jumped_pieces<'b>(&self, board: &'b Board) -> Vec<&'b Piece> {
        self.captured_positions()
            .into_iter()
            .filter_map(|pos| board.piece_at(pos))
            .collect()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.jump { " x " } else { " - " };
        let path: Vec<String> = self.path().iter().map(ToString::to_string).collect();
        f.write_str(&path.join(separator))
    }
}
