//! Pieces module - piece catalog and the falling piece
//!
//! Every rotation state is a precomputed list of cell offsets from the piece
//! anchor. Rotation is naive: the engine tries the next state in place and
//! rolls back if it does not fit. There is no wall-kick table.

use serde::{Deserialize, Serialize};

use crate::types::{ItemKind, PieceKind, Rotation, SPAWN_X, SPAWN_Y};

/// Offset of a single cell relative to piece origin
pub type MinoOffset = (i8, i8);

/// Shape of a piece - cell offsets from the piece origin
pub type PieceShape = &'static [MinoOffset];

const I_SHAPES: [[MinoOffset; 4]; 4] = [
    [(0, 1), (1, 1), (2, 1), (3, 1)],
    [(2, 0), (2, 1), (2, 2), (2, 3)],
    [(0, 2), (1, 2), (2, 2), (3, 2)],
    [(1, 0), (1, 1), (1, 2), (1, 3)],
];

const O_SHAPES: [[MinoOffset; 4]; 4] = [[(1, 0), (2, 0), (1, 1), (2, 1)]; 4];

const T_SHAPES: [[MinoOffset; 4]; 4] = [
    [(1, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (2, 1), (1, 2)],
    [(0, 1), (1, 1), (2, 1), (1, 2)],
    [(1, 0), (0, 1), (1, 1), (1, 2)],
];

const S_SHAPES: [[MinoOffset; 4]; 4] = [
    [(1, 0), (2, 0), (0, 1), (1, 1)],
    [(1, 0), (1, 1), (2, 1), (2, 2)],
    [(1, 1), (2, 1), (0, 2), (1, 2)],
    [(0, 0), (0, 1), (1, 1), (1, 2)],
];

const Z_SHAPES: [[MinoOffset; 4]; 4] = [
    [(0, 0), (1, 0), (1, 1), (2, 1)],
    [(2, 0), (1, 1), (2, 1), (1, 2)],
    [(0, 1), (1, 1), (1, 2), (2, 2)],
    [(1, 0), (0, 1), (1, 1), (0, 2)],
];

const J_SHAPES: [[MinoOffset; 4]; 4] = [
    [(0, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (2, 0), (1, 1), (1, 2)],
    [(0, 1), (1, 1), (2, 1), (2, 2)],
    [(1, 0), (1, 1), (0, 2), (1, 2)],
];

const L_SHAPES: [[MinoOffset; 4]; 4] = [
    [(2, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (1, 2), (2, 2)],
    [(0, 1), (1, 1), (2, 1), (0, 2)],
    [(0, 0), (1, 0), (1, 1), (1, 2)],
];

/// Weight piece: a 4-wide trapezoid with a single rotation state
const WEIGHT_SHAPE: [MinoOffset; 6] = [(1, 0), (2, 0), (0, 1), (1, 1), (2, 1), (3, 1)];

/// Get the shape (cell offsets) for a piece kind and rotation
pub fn get_shape(kind: PieceKind, rotation: Rotation) -> PieceShape {
    let r = rotation.index();
    match kind {
        PieceKind::I => &I_SHAPES[r],
        PieceKind::O => &O_SHAPES[r],
        PieceKind::T => &T_SHAPES[r],
        PieceKind::S => &S_SHAPES[r],
        PieceKind::Z => &Z_SHAPES[r],
        PieceKind::J => &J_SHAPES[r],
        PieceKind::L => &L_SHAPES[r],
        PieceKind::Weight => &WEIGHT_SHAPE,
    }
}

/// Number of distinct rotation states a piece kind cycles through
pub fn rotation_count(kind: PieceKind) -> usize {
    match kind {
        PieceKind::O | PieceKind::Weight => 1,
        PieceKind::I | PieceKind::S | PieceKind::Z => 2,
        PieceKind::T | PieceKind::J | PieceKind::L => 4,
    }
}

/// Item tag attached to one cell of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemTag {
    /// Index into the piece shape
    pub cell: usize,
    pub kind: ItemKind,
}

/// A piece on (or about to enter) the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i8,
    pub y: i8,
    pub item: Option<ItemTag>,
    /// Set once a weight piece can no longer descend
    pub landed: bool,
}

impl Piece {
    /// Create a new piece at spawn position
    pub fn new(kind: PieceKind) -> Self {
        Self {
            kind,
            rotation: Rotation::North,
            x: SPAWN_X,
            y: SPAWN_Y,
            item: None,
            landed: false,
        }
    }

    /// Create a new piece with an item on the given shape cell
    pub fn with_item(kind: PieceKind, cell: usize, item: ItemKind) -> Self {
        let mut piece = Self::new(kind);
        let len = piece.shape().len();
        piece.item = Some(ItemTag {
            cell: cell % len,
            kind: item,
        });
        piece
    }

    pub fn shape(&self) -> PieceShape {
        get_shape(self.kind, self.rotation)
    }

    pub fn is_weight(&self) -> bool {
        self.kind.is_weight()
    }

    /// Absolute board coordinates of every cell
    pub fn cells(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        self.shape()
            .iter()
            .map(move |&(dx, dy)| (self.x + dx, self.y + dy))
    }

    /// Absolute board coordinates of every cell with its item, if any
    pub fn cells_with_items(&self) -> impl Iterator<Item = (i8, i8, Option<ItemKind>)> + '_ {
        self.cells().enumerate().map(move |(i, (x, y))| {
            let item = self.item.filter(|tag| tag.cell == i).map(|tag| tag.kind);
            (x, y, item)
        })
    }

    /// Board position of the item cell
    pub fn item_position(&self) -> Option<(i8, i8, ItemKind)> {
        let tag = self.item?;
        let (dx, dy) = *self.shape().get(tag.cell)?;
        Some((self.x + dx, self.y + dy, tag.kind))
    }

    /// Column of the last cell in shape order; used as the attack gap column
    pub fn landing_column(&self) -> i8 {
        self.cells().last().map(|(x, _)| x).unwrap_or(self.x)
    }

    /// Lowest row (largest y) the piece occupies
    pub fn bottom_row(&self) -> i8 {
        self.cells().map(|(_, y)| y).max().unwrap_or(self.y)
    }

    pub fn moved(&self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// The next clockwise rotation state, in place (no kicks)
    pub fn rotated(&self) -> Self {
        if rotation_count(self.kind) == 1 {
            return *self;
        }
        Self {
            rotation: self.rotation.rotate_cw(),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_standard_shape_has_four_cells() {
        for kind in PieceKind::STANDARD {
            for rotation in Rotation::ALL {
                assert_eq!(get_shape(kind, rotation).len(), 4, "{kind:?} {rotation:?}");
            }
        }
    }

    #[test]
    fn test_weight_is_six_cells_and_does_not_rotate() {
        let piece = Piece::new(PieceKind::Weight);
        assert_eq!(piece.shape().len(), 6);
        assert_eq!(piece.rotated(), piece);
        assert_eq!(piece.bottom_row(), 1);
    }

    #[test]
    fn test_item_position_follows_piece() {
        let piece = Piece::with_item(PieceKind::T, 2, ItemKind::Bomb).moved(2, 5);
        assert_eq!(piece.item_position(), Some((3 + 2 + 1, 5 + 1, ItemKind::Bomb)));

        let tagged: Vec<_> = piece
            .cells_with_items()
            .filter_map(|(_, _, item)| item)
            .collect();
        assert_eq!(tagged, vec![ItemKind::Bomb]);
    }

    #[test]
    fn test_landing_column_is_last_cell() {
        let piece = Piece::new(PieceKind::L);
        // L north: last cell is (2, 1)
        assert_eq!(piece.landing_column(), 3 + 2);
    }

    #[test]
    fn test_rotation_cycles_back() {
        let piece = Piece::new(PieceKind::T);
        let back = piece.rotated().rotated().rotated().rotated();
        assert_eq!(back.rotation, Rotation::North);
    }
}
