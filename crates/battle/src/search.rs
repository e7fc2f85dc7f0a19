//! Placement search over a private copy of the board
//!
//! Every candidate is simulated on a clone of the live board; the search never
//! holds a reference into engine state while it mutates.

use std::iter;

use arrayvec::ArrayVec;

use crate::core::{rotation_count, Board, Piece};
use crate::types::{Rotation, BOARD_WIDTH};

/// Horizontal anchors tried for every rotation; starts left of the board so
/// shapes with empty leading columns can still reach column 0
const X_RANGE: std::ops::RangeInclusive<i8> = -3..=(BOARD_WIDTH as i8 + 2);

/// Upper bound on candidates: 4 rotations x 16 anchors
pub const MAX_CANDIDATES: usize = 64;

/// Linear evaluation weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub lines: f32,
    pub aggregate_height: f32,
    pub holes: f32,
    pub bumpiness: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            lines: 1.5,
            aggregate_height: -0.18,
            holes: -0.75,
            bumpiness: -0.3,
        }
    }
}

/// Board features used by the evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardFeatures {
    pub aggregate_height: u32,
    pub holes: u32,
    pub bumpiness: u32,
}

impl BoardFeatures {
    pub fn from_board(board: &Board) -> Self {
        let heights = board.column_heights();
        let aggregate_height = heights.iter().map(|&h| u32::from(h)).sum();
        let bumpiness = iter::zip(&heights, &heights[1..])
            .map(|(&a, &b)| u32::from(a.abs_diff(b)))
            .sum();
        Self {
            aggregate_height,
            holes: board.count_holes(),
            bumpiness,
        }
    }
}

/// Score a resulting board
pub fn evaluate(features: BoardFeatures, lines: usize, weights: &Weights) -> f32 {
    weights.lines * lines as f32
        + weights.aggregate_height * features.aggregate_height as f32
        + weights.holes * features.holes as f32
        + weights.bumpiness * features.bumpiness as f32
}

/// A simulated final placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub rotation: Rotation,
    pub x: i8,
    pub lines: usize,
    pub score: f32,
}

/// Hard-drop `piece` on `board` and resolve the placement
///
/// Returns the resulting board and the rows removed, or `None` if the start
/// position is invalid or the piece would rest partly above the top row.
pub fn simulate_drop(board: &Board, piece: Piece) -> Option<(Board, usize)> {
    if !board.is_valid_position(&piece) {
        return None;
    }
    let mut board = board.clone();
    let mut piece = piece;
    if piece.is_weight() {
        while board.process_weight_effect(&mut piece) {}
    } else {
        while board.is_valid_position(&piece.moved(0, 1)) {
            piece = piece.moved(0, 1);
        }
    }
    if piece.cells().any(|(_, y)| y < 0) {
        return None;
    }

    board.place_piece(&mut piece);
    let mut lines = board.process_item_effects(&piece);
    lines += board.clear_lines();
    Some((board, lines))
}

/// Enumerate and score every reachable-looking final placement
///
/// Candidates keep the piece's current row as their start row.
pub fn candidates(board: &Board, piece: &Piece, weights: &Weights) -> ArrayVec<Candidate, MAX_CANDIDATES> {
    let snapshot = board.clone();
    let rotations: &[Rotation] = if rotation_count(piece.kind) == 1 {
        std::slice::from_ref(&piece.rotation)
    } else {
        &Rotation::ALL
    };

    let mut out = ArrayVec::new();
    for &rotation in rotations {
        for x in X_RANGE {
            let start = Piece {
                rotation,
                x,
                ..*piece
            };
            let Some((result, lines)) = simulate_drop(&snapshot, start) else {
                continue;
            };
            let score = evaluate(BoardFeatures::from_board(&result), lines, weights);
            out.push(Candidate {
                rotation,
                x,
                lines,
                score,
            });
        }
    }
    out
}

/// Best placement for `piece`; ties keep the first candidate found
pub fn best_placement(board: &Board, piece: &Piece, weights: &Weights) -> Option<Candidate> {
    candidates(board, piece, weights)
        .into_iter()
        .reduce(|best, c| if c.score > best.score { c } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, PieceKind};

    #[test]
    fn test_features() {
        let board = Board::from_rows(&["#.........", "..........", "#..#......"]);
        let features = BoardFeatures::from_board(&board);
        assert_eq!(features.aggregate_height, 3 + 1);
        assert_eq!(features.holes, 1);
        // |3-0| + |0-0| + |0-1| + |1-0|
        assert_eq!(features.bumpiness, 5);
    }

    #[test]
    fn test_search_does_not_touch_live_board() {
        let board = Board::from_rows(&["####.#####"]);
        let before = board.clone();
        let _ = candidates(&board, &Piece::new(PieceKind::T), &Weights::default());
        assert_eq!(board, before);
    }

    #[test]
    fn test_prefers_completing_a_line() {
        let mut board = Board::new();
        for x in 0..10 {
            if x != 3 {
                board.set(x, 19, Cell::Block(PieceKind::O));
            }
        }
        let best = best_placement(&board, &Piece::new(PieceKind::I), &Weights::default()).unwrap();
        assert_eq!(best.lines, 1);
        let placed = Piece {
            rotation: best.rotation,
            x: best.x,
            ..Piece::new(PieceKind::I)
        };
        assert!(placed.cells().all(|(x, _)| x == 3));
    }

    #[test]
    fn test_no_candidate_when_piece_cannot_start() {
        let rows: Vec<&str> = vec!["##########"; 20];
        let board = Board::from_rows(&rows);
        assert!(best_placement(&board, &Piece::new(PieceKind::O), &Weights::default()).is_none());
    }

    #[test]
    fn test_candidate_count_bounded() {
        let board = Board::new();
        let all = candidates(&board, &Piece::new(PieceKind::T), &Weights::default());
        assert!(!all.is_empty());
        assert!(all.len() <= MAX_CANDIDATES);
        let o = candidates(&board, &Piece::new(PieceKind::O), &Weights::default());
        // O fits in 9 anchors on an empty board
        assert_eq!(o.len(), 9);
    }
}
