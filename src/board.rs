use crate::moves::Move;
use crate::piece::Piece;
use crate::types::{CellView, Color, MoveRecord, Position};

pub const SIZE: i32 = 8;
const CELLS_PER_ROW: usize = SIZE as usize;
const ROWS_PER_SIDE: i32 = 3;

/// Checkers board: an 8x8 grid of optional pieces, stored `[y][x]`.
///
/// The board owns every piece on it and is the only place cell contents
/// change during play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; CELLS_PER_ROW]; CELLS_PER_ROW],
}

impl Board {
    /// Creates the initial board: white men on the playable squares of rows
    /// 0-2, black men on rows 5-7.
    pub fn new() -> Self {
        let mut board = Self::empty();
        for y in 0..SIZE {
            let color = if y < ROWS_PER_SIDE {
                Color::White
            } else if y >= SIZE - ROWS_PER_SIDE {
                Color::Black
            } else {
                continue;
            };
            for x in 0..SIZE {
                if Self::is_checkerboard_space(x, y) {
                    board.place(Piece::new(Position::new(x, y), color));
                }
            }
        }
        board
    }

    pub fn empty() -> Self {
        Self {
            cells: [[None; CELLS_PER_ROW]; CELLS_PER_ROW],
        }
    }

    /// Builds a board holding exactly `pieces`. Pieces on unplayable or
    /// off-board squares are skipped.
    pub fn with_pieces(pieces: impl IntoIterator<Item = Piece>) -> Self {
        let mut board = Self::empty();
        for piece in pieces {
            board.place(piece);
        }
        board
    }

    /// Returns the piece at `(x, y)`, or `None` for empty and off-board cells.
    pub fn value_at(&self, x: i32, y: i32) -> Option<&Piece> {
        if Self::is_over_edge(x, y) {
            return None;
        }
        self.cells[y as usize][x as usize].as_ref()
    }

    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        self.value_at(pos.x, pos.y)
    }

    pub fn is_over_edge(x: i32, y: i32) -> bool {
        !(0..SIZE).contains(&x) || !(0..SIZE).contains(&y)
    }

    /// Dark squares, the only ones pieces ever stand on. Used for rendering.
    pub fn is_checkerboard_space(x: i32, y: i32) -> bool {
        !Self::is_over_edge(x, y) && (x + y) % 2 == 1
    }

    /// Puts `piece` on its own position, replacing any occupant.
    /// Returns `false` when that position is not a playable square.
    pub fn place(&mut self, piece: Piece) -> bool {
        let pos = piece.position();
        if !Self::is_checkerboard_space(pos.x, pos.y) {
            return false;
        }
        self.cells[pos.y as usize][pos.x as usize] = Some(piece);
        true
    }

    pub fn remove(&mut self, pos: Position) -> Option<Piece> {
        if Self::is_over_edge(pos.x, pos.y) {
            return None;
        }
        self.cells[pos.y as usize][pos.x as usize].take()
    }

    /// Applies an already validated move.
    ///
    /// The piece standing on the move's origin is relocated to its end, every
    /// piece captured along the chain is removed and the promotion check runs
    /// on the moved piece.
    pub fn apply_move(&mut self, mv: &Move) -> MoveRecord {
        let from = mv.starting_position();
        let to = mv.ending_position();
        let moving = self.remove(from);

        let captured = mv
            .captured_positions()
            .into_iter()
            .filter(|&pos| self.remove(pos).is_some())
            .collect();

        let mut promoted = false;
        if let Some(mut piece) = moving {
            piece.move_to(to);
            promoted = piece.check_if_should_be_king();
            self.place(piece);
        }

        MoveRecord {
            from,
            to,
            captured,
            promoted,
        }
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.cells.iter().flatten().flatten()
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces().filter(move |piece| piece.color() == color)
    }

    pub fn count(&self, color: Color) -> usize {
        self.pieces_of(color).count()
    }

    /// Returns `(white_count, black_count)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.count(Color::White), self.count(Color::Black))
    }

    /// Per-cell view, rows first.
    pub fn to_cells(&self) -> Vec<Vec<Option<CellView>>> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.map(|piece| CellView {
                            color: piece.color(),
                            is_king: piece.is_king(),
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// ASCII grid with a coordinate header, two characters per cell.
    pub fn render(&self) -> String {
        let mut out = String::from("  0 1 2 3 4 5 6 7\n");
        for y in 0..SIZE {
            out.push_str(&format!("{y} "));
            for x in 0..SIZE {
                match self.value_at(x, y) {
                    Some(piece) => out.push_str(piece.symbol()),
                    None if Self::is_checkerboard_space(x, y) => out.push_str(". "),
                    None => out.push_str("  "),
                }
            }
            out.push('\n');
        }
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn man(x: i32, y: i32, color: Color) -> Piece {
        Piece::new(Position::new(x, y), color)
    }

    #[test]
    fn initial_board_has_twelve_men_per_side_on_dark_squares() {
        let board = Board::new();

        assert_eq!(board.counts(), (12, 12));
        assert!(board.pieces().all(|p| {
            let pos = p.position();
            Board::is_checkerboard_space(pos.x, pos.y) && !p.is_king()
        }));
        assert!(board.pieces_of(Color::White).all(|p| p.position().y <= 2));
        assert!(board.pieces_of(Color::Black).all(|p| p.position().y >= 5));
        assert_eq!(board.value_at(1, 2).map(|p| p.color()), Some(Color::White));
        assert!(board.value_at(0, 3).is_none());
    }

    #[test]
    fn edge_and_square_geometry() {
        assert!(Board::is_over_edge(-1, 0));
        assert!(Board::is_over_edge(0, 8));
        assert!(!Board::is_over_edge(7, 7));
        assert!(Board::is_checkerboard_space(1, 0));
        assert!(!Board::is_checkerboard_space(0, 0));
        assert!(!Board::is_checkerboard_space(-1, 2));
        assert!(Board::new().value_at(-3, 40).is_none());
    }

    #[test]
    fn place_rejects_light_squares() {
        let mut board = Board::empty();

        assert!(!board.place(man(0, 0, Color::White)));
        assert!(board.place(man(1, 0, Color::White)));
        assert_eq!(board.counts(), (1, 0));
    }

    #[test]
    fn apply_step_relocates_piece() {
        let mut board = Board::new();
        let mv = Move::step(Position::new(1, 2), Position::new(0, 3));

        let record = board.apply_move(&mv);

        assert!(board.value_at(1, 2).is_none());
        assert_eq!(board.value_at(0, 3).map(|p| p.position()), Some(Position::new(0, 3)));
        assert!(record.captured.is_empty());
        assert!(!record.promoted);
        assert_eq!(board.counts(), (12, 12));
    }

    #[test]
    fn apply_chain_removes_every_captured_piece() {
        let mut board = Board::with_pieces([
            man(1, 0, Color::White),
            man(2, 1, Color::Black),
            man(4, 3, Color::Black),
            man(6, 5, Color::Black),
        ]);
        let first = Rc::new(Move::new(Position::new(1, 0), Position::new(3, 2), None, true));
        let second = Move::new(Position::new(1, 0), Position::new(5, 4), Some(first), true);

        let record = board.apply_move(&second);

        assert_eq!(record.captured, vec![Position::new(2, 1), Position::new(4, 3)]);
        assert_eq!(board.counts(), (1, 1));
        assert!(board.value_at(5, 4).is_some());
        assert!(board.value_at(6, 5).is_some());
    }

    #[test]
    fn apply_move_crowns_on_far_rank() {
        let mut board = Board::with_pieces([man(3, 6, Color::White)]);

        let record = board.apply_move(&Move::step(Position::new(3, 6), Position::new(2, 7)));

        assert!(record.promoted);
        assert!(board.value_at(2, 7).is_some_and(|p| p.is_king()));
    }

    #[test]
    fn render_marks_pieces_kings_and_empty_dark_squares() {
        let mut king = man(1, 0, Color::Black);
        king.set_king();
        let board = Board::with_pieces([king, man(0, 1, Color::White)]);

        let text = board.render();
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows[0], "  0 1 2 3 4 5 6 7");
        assert_eq!(rows[1], "0   BK  .   .   . ");
        assert_eq!(rows[2], "1 W   .   .   .   ");
        assert_eq!(rows.len(), 9);
    }
}
