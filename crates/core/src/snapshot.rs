use serde::{Deserialize, Serialize};

use crate::board::CodeGrid;
use crate::pieces::{ItemTag, Piece};
use crate::types::{PieceKind, Rotation, BOARD_HEIGHT, BOARD_WIDTH};

/// Visible state of one piece
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceSnapshot {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i8,
    pub y: i8,
    /// Absolute board coordinates of every cell
    pub cells: Vec<(i8, i8)>,
    pub item: Option<ItemTag>,
}

impl From<Piece> for PieceSnapshot {
    fn from(value: Piece) -> Self {
        Self {
            kind: value.kind,
            rotation: value.rotation,
            x: value.x,
            y: value.y,
            cells: value.cells().collect(),
            item: value.item,
        }
    }
}

impl PieceSnapshot {
    pub fn color_id(&self) -> u8 {
        self.kind.color_id()
    }
}

/// Immutable capture of one player's visible state, used for replication
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// Cell codes, row-major, row 0 at the top
    pub board: CodeGrid,
    /// Item codes, 0 where no item
    pub items: CodeGrid,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub current: Option<PieceSnapshot>,
    pub next: Option<PieceSnapshot>,
    pub pending_attacks: u32,
    pub game_over: bool,
    /// Capture time in Unix milliseconds
    pub captured_at_ms: u64,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        self.board = [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        self.items = [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        self.score = 0;
        self.level = 1;
        self.lines = 0;
        self.current = None;
        self.next = None;
        self.pending_attacks = 0;
        self.game_over = false;
        self.captured_at_ms = 0;
    }

    /// Per-cell attack mask derived from the cell codes
    pub fn attack_mask(&self) -> [[bool; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize] {
        self.board.map(|row| row.map(|code| code == 8))
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        let mut s = Self {
            board: [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize],
            items: [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize],
            score: 0,
            level: 1,
            lines: 0,
            current: None,
            next: None,
            pending_attacks: 0,
            game_over: false,
            captured_at_ms: 0,
        };
        s.clear();
        s
    }
}
