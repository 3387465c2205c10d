use std::rc::Rc;

use tracing::debug;

use crate::board::Board;
use crate::moves::Move;
use crate::types::{Color, Position};

const SIDEWAYS: [i32; 2] = [-1, 1];

/// A man or king standing on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    position: Position,
    color: Color,
    king: bool,
}

impl Piece {
    pub fn new(position: Position, color: Color) -> Self {
        Self {
            position,
            color,
            king: false,
        }
    }

    pub fn crowned(position: Position, color: Color) -> Self {
        Self {
            position,
            color,
            king: true,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is_king(&self) -> bool {
        self.king
    }

    pub fn set_king(&mut self) {
        self.king = true;
    }

    pub(crate) fn move_to(&mut self, position: Position) {
        self.position = position;
    }

    /// Two-character cell label: `W `, `WK`, `B `, `BK`.
    pub fn symbol(&self) -> &'static str {
        match (self.color, self.king) {
            (Color::White, false) => "W ",
            (Color::White, true) => "WK",
            (Color::Black, false) => "B ",
            (Color::Black, true) => "BK",
        }
    }

    /// Crowns the piece if it stands on its far rank.
    /// Returns `true` only when this call did the crowning.
    pub fn check_if_should_be_king(&mut self) -> bool {
        if self.king || self.position.y != self.color.promotion_row() {
            return false;
        }
        self.set_king();
        true
    }

    /// Row directions this piece may travel in, forward first.
    fn row_steps(&self) -> &'static [i32] {
        match (self.king, self.color) {
            (true, Color::White) => &[1, -1],
            (true, Color::Black) => &[-1, 1],
            (false, Color::White) => &[1],
            (false, Color::Black) => &[-1],
        }
    }

    /// Every move this piece can make: plain diagonal steps onto empty
    /// squares, then every hop of every jump chain.
    pub fn all_possible_moves(&self, board: &Board) -> Vec<Rc<Move>> {
        let mut moves = Vec::new();

        for dx in SIDEWAYS {
            for &dy in self.row_steps() {
                let target = self.position.offset(dx, dy);
                if Board::is_over_edge(target.x, target.y) {
                    continue;
                }
                if board.piece_at(target).is_none() {
                    moves.push(Rc::new(Move::step(self.position, target)));
                }
            }
        }

        moves.extend(self.all_possible_jumps(board, None));

        debug!(
            piece = %self.position,
            color = %self.color,
            king = self.king,
            count = moves.len(),
            "generated moves"
        );
        moves
    }

    /// Jump hops reachable from this piece's square.
    ///
    /// `preceding` is the hop that brought the chain here; it is `None` for a
    /// real piece and `Some` when `self` is the stand-in continuing a chain.
    /// Every returned hop carries the chain's true origin, and each landing
    /// square is searched again for further hops.
    pub fn all_possible_jumps(&self, board: &Board, preceding: Option<&Rc<Move>>) -> Vec<Rc<Move>> {
        let origin = preceding.map_or(self.position, |mv| mv.starting_position());
        let arrived_from = preceding.map(|mv| mv.hop_start());
        let captured = preceding.map(|mv| mv.captured_positions()).unwrap_or_default();
        let mut moves = Vec::new();

        for dx in SIDEWAYS {
            for &dy in self.row_steps() {
                let landing = self.position.offset(2 * dx, 2 * dy);
                if Board::is_over_edge(landing.x, landing.y) {
                    continue;
                }
                if arrived_from == Some(landing) {
                    continue;
                }

                let over = self.position.midpoint(landing);
                let Some(jumped) = board.piece_at(over) else {
                    continue;
                };
                if jumped.color() == self.color || captured.contains(&over) {
                    continue;
                }
                if board.piece_at(landing).is_some() {
                    continue;
                }

                let hop = Rc::new(Move::new(origin, landing, preceding.cloned(), true));
                moves.push(Rc::clone(&hop));

                let stand_in = Piece {
                    position: landing,
                    ..*self
                };
                moves.extend(stand_in.all_possible_jumps(board, Some(&hop)));
            }
        }

        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn man(x: i32, y: i32, color: Color) -> Piece {
        Piece::new(Position::new(x, y), color)
    }

    fn king(x: i32, y: i32, color: Color) -> Piece {
        Piece::crowned(Position::new(x, y), color)
    }

    fn ends(moves: &[Rc<Move>]) -> Vec<Position> {
        moves.iter().map(|mv| mv.ending_position()).collect()
    }

    #[test]
    fn white_man_steps_forward_only() {
        let piece = man(3, 2, Color::White);
        let board = Board::with_pieces([piece]);

        let moves = piece.all_possible_moves(&board);

        assert_eq!(ends(&moves), vec![Position::new(2, 3), Position::new(4, 3)]);
        assert!(moves.iter().all(|mv| !mv.is_jump() && mv.previous().is_none()));
    }

    #[test]
    fn black_man_steps_toward_row_zero() {
        let piece = man(2, 5, Color::Black);
        let board = Board::with_pieces([piece]);

        assert_eq!(
            ends(&piece.all_possible_moves(&board)),
            vec![Position::new(1, 4), Position::new(3, 4)]
        );
    }

    #[test]
    fn king_steps_in_four_directions() {
        let piece = king(3, 4, Color::White);
        let board = Board::with_pieces([piece]);

        let mut targets = ends(&piece.all_possible_moves(&board));
        targets.sort_by_key(|p| (p.x, p.y));

        assert_eq!(
            targets,
            vec![
                Position::new(2, 3),
                Position::new(2, 5),
                Position::new(4, 3),
                Position::new(4, 5),
            ]
        );
    }

    #[test]
    fn corner_and_blocked_squares_are_skipped() {
        let piece = man(0, 1, Color::White);
        let board = Board::with_pieces([piece, man(1, 2, Color::White)]);

        assert!(piece.all_possible_moves(&board).is_empty());
    }

    #[test]
    fn initial_position_moves_land_on_empty_squares() {
        let board = Board::new();

        for piece in board.pieces() {
            for mv in piece.all_possible_moves(&board) {
                let end = mv.ending_position();
                assert!(!Board::is_over_edge(end.x, end.y));
                assert!(board.piece_at(end).is_none());
                assert!(!mv.is_jump());
            }
        }
    }

    #[test]
    fn single_jump_over_opponent() {
        let piece = man(2, 3, Color::White);
        let board = Board::with_pieces([piece, man(3, 4, Color::Black)]);

        let jumps = piece.all_possible_jumps(&board, None);

        assert_eq!(jumps.len(), 1);
        assert_eq!(jumps[0].starting_position(), Position::new(2, 3));
        assert_eq!(jumps[0].ending_position(), Position::new(4, 5));
        assert_eq!(jumps[0].captured_positions(), vec![Position::new(3, 4)]);
    }

    #[test]
    fn no_jump_over_own_color_or_onto_occupied_square() {
        let piece = man(2, 3, Color::White);
        let own = Board::with_pieces([piece, man(3, 4, Color::White)]);
        let blocked = Board::with_pieces([piece, man(3, 4, Color::Black), man(4, 5, Color::Black)]);

        assert!(piece.all_possible_jumps(&own, None).is_empty());
        assert!(piece.all_possible_jumps(&blocked, None).is_empty());
    }

    #[test]
    fn man_cannot_jump_backward() {
        let piece = man(4, 5, Color::White);
        let board = Board::with_pieces([piece, man(3, 4, Color::Black)]);

        assert!(piece.all_possible_jumps(&board, None).is_empty());
    }

    #[test]
    fn double_jump_surfaces_each_hop_with_shared_origin() {
        let piece = man(1, 0, Color::White);
        let board = Board::with_pieces([piece, man(2, 1, Color::Black), man(4, 3, Color::Black)]);

        let jumps = piece.all_possible_jumps(&board, None);

        assert_eq!(ends(&jumps), vec![Position::new(3, 2), Position::new(5, 4)]);
        assert!(jumps.iter().all(|mv| mv.starting_position() == Position::new(1, 0)));
        assert_eq!(jumps[1].previous(), Some(&jumps[0]));
        assert_eq!(
            jumps[1].captured_positions(),
            vec![Position::new(2, 1), Position::new(4, 3)]
        );
    }

    #[test]
    fn king_chain_may_turn_between_hops() {
        let piece = king(1, 2, Color::Black);
        let board = Board::with_pieces([piece, man(2, 3, Color::White), man(4, 3, Color::White)]);

        let jumps = piece.all_possible_jumps(&board, None);

        // Up to (3,4), then down to (5,2).
        assert_eq!(ends(&jumps), vec![Position::new(3, 4), Position::new(5, 2)]);
        assert_eq!(jumps[1].captured_positions().len(), 2);
    }

    #[test]
    fn king_does_not_bounce_back_over_the_same_piece() {
        let piece = king(2, 3, Color::White);
        let board = Board::with_pieces([piece, man(3, 4, Color::Black)]);

        let jumps = piece.all_possible_jumps(&board, None);

        assert_eq!(ends(&jumps), vec![Position::new(4, 5)]);
    }

    #[test]
    fn king_circling_a_ring_terminates() {
        // After the first hop the king stands inside a ring of four black
        // men it can walk around back to (3,2). Only the captured-piece check
        // stops the search from going round again.
        let piece = king(1, 0, Color::White);
        let board = Board::with_pieces([
            piece,
            man(2, 1, Color::Black),
            man(4, 3, Color::Black),
            man(4, 5, Color::Black),
            man(2, 5, Color::Black),
            man(2, 3, Color::Black),
        ]);

        let jumps = piece.all_possible_jumps(&board, None);

        for mv in &jumps {
            let captured = mv.captured_positions();
            let mut unique = captured.clone();
            unique.sort_by_key(|p| (p.x, p.y));
            unique.dedup();
            assert_eq!(unique.len(), captured.len());
        }
        let full_laps: Vec<_> = jumps
            .iter()
            .filter(|mv| mv.captured_positions().len() == 5)
            .collect();
        assert_eq!(full_laps.len(), 2);
        assert!(full_laps.iter().all(|mv| mv.ending_position() == Position::new(3, 2)));
        assert!(jumps.iter().all(|mv| mv.captured_positions().len() <= 5));
    }

    #[test]
    fn chain_never_lands_on_its_own_origin() {
        let piece = king(3, 2, Color::White);
        let board = Board::with_pieces([
            piece,
            man(4, 3, Color::Black),
            man(4, 5, Color::Black),
            man(2, 5, Color::Black),
            man(2, 3, Color::Black),
        ]);

        let jumps = piece.all_possible_jumps(&board, None);

        assert!(jumps.iter().all(|mv| mv.ending_position() != Position::new(3, 2)));
        let longest = jumps.iter().map(|mv| mv.captured_positions().len()).max();
        assert_eq!(longest, Some(3));
    }

    #[test]
    fn promotion_only_on_far_rank_and_is_sticky() {
        let mut white = man(2, 7, Color::White);
        let mut black = man(3, 0, Color::Black);
        let mut not_yet = man(3, 6, Color::White);

        assert!(white.check_if_should_be_king());
        assert!(!white.check_if_should_be_king());
        assert!(white.is_king());
        assert!(black.check_if_should_be_king());
        assert!(!not_yet.check_if_should_be_king());
        assert!(!not_yet.is_king());
    }
}
