//! Board module - manages the game grid
//!
//! The board is a 10x20 grid of [`Cell`]s with a parallel grid of item tags.
//! Uses flat arrays for cache locality and zero allocation on the hot paths.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19
//! (top to bottom). Pieces may extend above row 0 while falling; those cells
//! are never written.
//!
//! Attack rows are filler rows pushed in from the bottom by the opponent. The
//! board tracks how many contiguous attack rows sit at the bottom and never
//! lets that count exceed [`MAX_ATTACK_LINES`].

use arrayvec::ArrayVec;

use crate::pieces::Piece;
use crate::types::{Cell, ItemKind, BOARD_HEIGHT, BOARD_WIDTH, MAX_ATTACK_LINES};

/// Total number of cells on the board
const BOARD_SIZE: usize = (BOARD_WIDTH * BOARD_HEIGHT) as usize;

const WIDTH: usize = BOARD_WIDTH as usize;
const HEIGHT: usize = BOARD_HEIGHT as usize;

/// Row-major grid of integer codes, as exchanged with renderers and peers
pub type CodeGrid = [[u8; WIDTH]; HEIGHT];

/// The game board - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
    /// Item tags, same layout as `cells`
    items: [Option<ItemKind>; BOARD_SIZE],
    attack_line_count: u8,
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [Cell::Empty; BOARD_SIZE],
            items: [None; BOARD_SIZE],
            attack_line_count: 0,
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * WIDTH + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    pub fn item(&self, x: i8, y: i8) -> Option<ItemKind> {
        Self::index(x, y).and_then(|idx| self.items[idx])
    }

    /// Check if position is inside the board and empty
    pub fn is_empty_at(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Cell::Empty))
    }

    /// Check if a single piece cell may sit at (x, y)
    ///
    /// Columns must be on the board and rows above the floor. Rows above the
    /// top (y < 0) are free space.
    #[inline]
    pub fn is_free(&self, x: i8, y: i8) -> bool {
        if x < 0 || x >= BOARD_WIDTH as i8 || y >= BOARD_HEIGHT as i8 {
            return false;
        }
        y < 0 || self.is_empty_at(x, y)
    }

    /// Check whether every cell of the piece fits on the board
    pub fn is_valid_position(&self, piece: &Piece) -> bool {
        piece.cells().all(|(x, y)| self.is_free(x, y))
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= HEIGHT {
            return false;
        }
        let start = y * WIDTH;
        self.cells[start..start + WIDTH].iter().all(|c| !c.is_empty())
    }

    /// A row counts as an attack row when it holds attack blocks and nothing else
    fn is_attack_row(&self, y: usize) -> bool {
        let start = y * WIDTH;
        let row = &self.cells[start..start + WIDTH];
        row.iter().any(Cell::is_attack) && row.iter().all(|c| c.is_empty() || c.is_attack())
    }

    /// Write the piece into the grid: color code and item tags for every cell
    ///
    /// Cells above the top row are skipped; nothing is ever written outside the
    /// board. A weight piece is marked as landed.
    pub fn place_piece(&mut self, piece: &mut Piece) {
        for (x, y, item) in piece.cells_with_items() {
            let Some(idx) = Self::index(x, y) else {
                continue;
            };
            self.cells[idx] = match item {
                Some(ItemKind::Bomb) => Cell::Bomb,
                _ => Cell::Block(piece.kind),
            };
            self.items[idx] = item;
        }
        if piece.is_weight() {
            piece.landed = true;
        }
    }

    /// Remove a single row and shift all rows above down by one
    fn remove_row(&mut self, y: usize) {
        if y >= HEIGHT {
            return;
        }
        for row in (1..=y).rev() {
            let src = (row - 1) * WIDTH;
            let dst = row * WIDTH;
            self.cells.copy_within(src..src + WIDTH, dst);
            self.items.copy_within(src..src + WIDTH, dst);
        }
        self.cells[..WIDTH].fill(Cell::Empty);
        self.items[..WIDTH].fill(None);
    }

    /// Clear all full rows and return the row indices that were cleared (sorted bottom to top)
    /// Uses a two-pointer compaction with zero allocation
    pub fn clear_full_rows(&mut self) -> ArrayVec<usize, HEIGHT> {
        let mut cleared_rows = ArrayVec::new();
        if !(0..HEIGHT).any(|y| self.is_row_full(y)) {
            return cleared_rows;
        }

        let mut write_y = HEIGHT;
        for read_y in (0..HEIGHT).rev() {
            if self.is_row_full(read_y) {
                cleared_rows.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src = read_y * WIDTH;
                    let dst = write_y * WIDTH;
                    self.cells.copy_within(src..src + WIDTH, dst);
                    self.items.copy_within(src..src + WIDTH, dst);
                }
            }
        }

        self.cells[..write_y * WIDTH].fill(Cell::Empty);
        self.items[..write_y * WIDTH].fill(None);

        self.recount_attack_lines();
        cleared_rows
    }

    /// Clear all full rows, returning how many were removed
    pub fn clear_lines(&mut self) -> usize {
        self.clear_full_rows().len()
    }

    /// Resolve the item carried by a just-placed piece
    ///
    /// - line-clear: removes the item's row regardless of fullness
    /// - bomb: empties the full row and column through the item cell
    ///
    /// Returns the number of rows removed by line-clear items; bomb rows are not
    /// counted as cleared lines.
    pub fn process_item_effects(&mut self, piece: &Piece) -> usize {
        let Some((x, y, item)) = piece.item_position() else {
            return 0;
        };
        if Self::index(x, y).is_none() {
            return 0;
        }

        let removed = match item {
            ItemKind::LineClear => {
                self.remove_row(y as usize);
                1
            }
            ItemKind::Bomb => {
                let row = y as usize * WIDTH;
                self.cells[row..row + WIDTH].fill(Cell::Empty);
                self.items[row..row + WIDTH].fill(None);
                for yy in 0..HEIGHT {
                    let idx = yy * WIDTH + x as usize;
                    self.cells[idx] = Cell::Empty;
                    self.items[idx] = None;
                }
                0
            }
            ItemKind::DoubleScore => 0,
        };
        self.recount_attack_lines();
        removed
    }

    /// Advance a weight piece by one row, deleting whatever sits directly
    /// beneath its bottom row first
    ///
    /// Returns true if the piece descended. Once the bottom row rests on the
    /// floor the piece is marked as landed and stays put.
    pub fn process_weight_effect(&mut self, piece: &mut Piece) -> bool {
        if !piece.is_weight() || piece.landed {
            return false;
        }

        let bottom = piece.bottom_row();
        if bottom + 1 >= BOARD_HEIGHT as i8 {
            piece.landed = true;
            return false;
        }

        let below: ArrayVec<i8, 8> = piece
            .cells()
            .filter(|&(_, y)| y == bottom)
            .map(|(x, _)| x)
            .collect();
        for x in below {
            if let Some(idx) = Self::index(x, bottom + 1) {
                self.cells[idx] = Cell::Empty;
                self.items[idx] = None;
            }
        }

        let next = piece.moved(0, 1);
        if !self.is_valid_position(&next) {
            // Something other than the floor still blocks the body; treat as landed.
            piece.landed = true;
            return false;
        }
        *piece = next;
        if piece.bottom_row() + 1 >= BOARD_HEIGHT as i8 {
            piece.landed = true;
        }
        self.recount_attack_lines();
        true
    }

    /// Push `n` attack rows in from the bottom with an empty cell at `gap_column`
    ///
    /// Existing rows shift up by `n` (rows pushed past the top are lost). If the
    /// addition would exceed the attack cap, the oldest (bottommost) attack rows
    /// are trimmed by the excess first.
    pub fn add_attack_lines(&mut self, n: usize, gap_column: usize) {
        let n = n.min(MAX_ATTACK_LINES as usize);
        if n == 0 {
            return;
        }
        let gap = gap_column.min(WIDTH - 1);

        let excess = (self.attack_line_count as usize + n).saturating_sub(MAX_ATTACK_LINES as usize);
        for _ in 0..excess {
            self.remove_row(HEIGHT - 1);
        }

        self.cells.copy_within(n * WIDTH.., 0);
        self.items.copy_within(n * WIDTH.., 0);
        for y in HEIGHT - n..HEIGHT {
            let start = y * WIDTH;
            self.cells[start..start + WIDTH].fill(Cell::Attack);
            self.items[start..start + WIDTH].fill(None);
            self.cells[start + gap] = Cell::Empty;
        }

        self.recount_attack_lines();
    }

    /// Count contiguous attack rows from the bottom, stopping at the first other row
    fn recount_attack_lines(&mut self) {
        let count = (0..HEIGHT)
            .rev()
            .take_while(|&y| self.is_attack_row(y))
            .count();
        self.attack_line_count = count.min(MAX_ATTACK_LINES as usize) as u8;
    }

    pub fn attack_line_count(&self) -> u8 {
        self.attack_line_count
    }

    pub fn is_attack_lines_full(&self) -> bool {
        self.attack_line_count >= MAX_ATTACK_LINES
    }

    /// Height of every column (0 for an empty column)
    pub fn column_heights(&self) -> [u8; WIDTH] {
        let mut heights = [0u8; WIDTH];
        for (x, h) in heights.iter_mut().enumerate() {
            if let Some(top) = (0..HEIGHT).find(|&y| !self.cells[y * WIDTH + x].is_empty()) {
                *h = (HEIGHT - top) as u8;
            }
        }
        heights
    }

    /// Empty cells with at least one filled cell above them in the same column
    pub fn count_holes(&self) -> u32 {
        let mut holes = 0;
        for x in 0..WIDTH {
            let mut covered = false;
            for y in 0..HEIGHT {
                let filled = !self.cells[y * WIDTH + x].is_empty();
                if filled {
                    covered = true;
                } else if covered {
                    holes += 1;
                }
            }
        }
        holes
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Write the cell codes into a row-major grid
    pub fn write_code_grid(&self, out: &mut CodeGrid) {
        for (y, row) in out.iter_mut().enumerate() {
            for (x, v) in row.iter_mut().enumerate() {
                *v = self.cells[y * WIDTH + x].code();
            }
        }
    }

    /// Write the item codes into a row-major grid (0 = no item)
    pub fn write_item_grid(&self, out: &mut CodeGrid) {
        for (y, row) in out.iter_mut().enumerate() {
            for (x, v) in row.iter_mut().enumerate() {
                *v = self.items[y * WIDTH + x].map(|i| i.code()).unwrap_or(0);
            }
        }
    }

    /// Per-cell attack mask (true where an attack block sits)
    pub fn attack_mask(&self) -> [[bool; WIDTH]; HEIGHT] {
        let mut mask = [[false; WIDTH]; HEIGHT];
        for (y, row) in mask.iter_mut().enumerate() {
            for (x, v) in row.iter_mut().enumerate() {
                *v = self.cells[y * WIDTH + x].is_attack();
            }
        }
        mask
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
        self.items.fill(None);
        self.attack_line_count = 0;
    }

    /// Build a board from text rows, top to bottom, for tests and scripted setups
    ///
    /// `.` empty, `#` block, `A` attack, `B` bomb. Missing rows at the top are empty.
    pub fn from_rows(rows: &[&str]) -> Self {
        let mut board = Self::new();
        let offset = HEIGHT.saturating_sub(rows.len());
        for (i, row) in rows.iter().take(HEIGHT).enumerate() {
            for (x, ch) in row.chars().take(WIDTH).enumerate() {
                let cell = match ch {
                    '#' => Cell::Block(crate::types::PieceKind::O),
                    'A' => Cell::Attack,
                    'B' => Cell::Bomb,
                    _ => Cell::Empty,
                };
                board.cells[(offset + i) * WIDTH + x] = cell;
            }
        }
        board.recount_attack_lines();
        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
