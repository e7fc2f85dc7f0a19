//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the application.
//! All types are plain data with no game logic, making them usable in any
//! context (simulation, heuristic opponent, wire protocol).
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, row 0 at the top)
//! - **Spawn position**: (3, 0)
//! - **Attack cap**: at most 10 contiguous attack rows at the bottom
//!
//! # Cell Codes
//!
//! Boards are exchanged as grids of integer codes:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | empty |
//! | 1-7 | piece colors (I, O, T, S, Z, J, L) |
//! | 8 | attack block |
//! | 9 | bomb marker |
//!
//! # Examples
//!
//! ```
//! use stackduel_types::{Action, Cell, PieceKind, Rotation, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::from_str("t"), Some(PieceKind::T));
//! assert_eq!(Rotation::North.rotate_cw(), Rotation::East);
//! assert_eq!(Action::from_str("hardDrop"), Some(Action::HardDrop));
//! assert_eq!(Cell::Attack.code(), 8);
//! assert_eq!((BOARD_WIDTH, BOARD_HEIGHT), (10, 20));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Maximum number of contiguous attack rows a board may hold
pub const MAX_ATTACK_LINES: u8 = 10;

/// Spawn anchor for every new piece
pub const SPAWN_X: i8 = 3;
pub const SPAWN_Y: i8 = 0;

/// Lines that must be cleared between two item pieces in item mode
pub const ITEM_LINE_INTERVAL: u32 = 10;

/// Duration of the double-score power-up in engine milliseconds
pub const DOUBLE_SCORE_MS: u32 = 10_000;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Default match time limit for the time-attack mode (seconds)
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 180;

/// Drop intervals by level (milliseconds per row)
///
/// Index 0 = Level 1, Index 8 = Level 9+
pub const DROP_INTERVALS: [u32; 9] = [1000, 800, 650, 500, 400, 320, 250, 200, 160];

/// Absolute minimum drop interval (100ms)
pub const DROP_INTERVAL_MIN_MS: u32 = 100;

/// Points per placement by cleared-row count, multiplied by the level.
///
/// Clears larger than four rows (possible with a line-clear item) score as four.
pub const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_table_matches_rules() {
        assert_eq!(LINE_SCORES[1], 100);
        assert_eq!(LINE_SCORES[2], 300);
        assert_eq!(LINE_SCORES[3], 500);
        assert_eq!(LINE_SCORES[4], 800);
    }

    #[test]
    fn cell_codes_roundtrip() {
        for code in 0..=9u8 {
            let cell = Cell::from_code(code).expect("valid code");
            assert_eq!(cell.code(), code);
        }
        assert_eq!(Cell::from_code(10), None);
    }

    #[test]
    fn difficulty_controls_lines_per_level() {
        assert_eq!(Difficulty::Easy.lines_per_level(), 12);
        assert_eq!(Difficulty::Normal.lines_per_level(), 10);
        assert_eq!(Difficulty::Hard.lines_per_level(), 8);
    }

    #[test]
    fn default_key_map_covers_every_action() {
        let map = KeyMap::default();
        for action in Action::ALL {
            assert!(map.keys_for(action).next().is_some(), "{action:?} unbound");
        }
        assert_eq!(map.action_for("space"), Some(Action::HardDrop));
        assert_eq!(map.action_for("unknown"), None);
    }
}

/// Piece kinds: the seven tetrominoes plus the special weight piece
///
/// - **I**: Cyan, horizontal bar
/// - **O**: Yellow, 2x2 square
/// - **T**: Magenta, T-shaped
/// - **S**: Green, S-shaped
/// - **Z**: Red, Z-shaped (mirror of S)
/// - **J**: Blue, J-shaped
/// - **L**: Orange, L-shaped (mirror of J)
/// - **Weight**: 4-wide trapezoid that tunnels through stacked blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
    Weight,
}

impl PieceKind {
    /// The seven standard tetrominoes, in bag order before shuffling
    pub const STANDARD: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use stackduel_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("Weight"), Some(PieceKind::Weight));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "o" => Some(PieceKind::O),
            "t" => Some(PieceKind::T),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            "weight" => Some(PieceKind::Weight),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::O => "o",
            PieceKind::T => "t",
            PieceKind::S => "s",
            PieceKind::Z => "z",
            PieceKind::J => "j",
            PieceKind::L => "l",
            PieceKind::Weight => "weight",
        }
    }

    /// Color code written into the board for cells of this piece (1-7)
    ///
    /// The weight piece has no color of its own and is drawn as code 1.
    pub fn color_id(&self) -> u8 {
        match self {
            PieceKind::I | PieceKind::Weight => 1,
            PieceKind::O => 2,
            PieceKind::T => 3,
            PieceKind::S => 4,
            PieceKind::Z => 5,
            PieceKind::J => 6,
            PieceKind::L => 7,
        }
    }

    /// Standard tetromino for a color code
    pub fn from_color_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(PieceKind::I),
            2 => Some(PieceKind::O),
            3 => Some(PieceKind::T),
            4 => Some(PieceKind::S),
            5 => Some(PieceKind::Z),
            6 => Some(PieceKind::J),
            7 => Some(PieceKind::L),
            _ => None,
        }
    }

    pub fn is_weight(&self) -> bool {
        matches!(self, PieceKind::Weight)
    }
}

/// Rotation states
///
/// The rotation cycle goes: North → East → South → West → North.
/// There is no wall-kick table: a rotation either fits in place or is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    North,
    East,
    South,
    West,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::North,
        Rotation::East,
        Rotation::South,
        Rotation::West,
    ];

    /// Rotate clockwise (90°)
    ///
    /// # Examples
    ///
    /// ```
    /// use stackduel_types::Rotation;
    ///
    /// assert_eq!(Rotation::North.rotate_cw(), Rotation::East);
    /// assert_eq!(Rotation::West.rotate_cw(), Rotation::North);
    /// ```
    pub fn rotate_cw(&self) -> Self {
        match self {
            Rotation::North => Rotation::East,
            Rotation::East => Rotation::South,
            Rotation::South => Rotation::West,
            Rotation::West => Rotation::North,
        }
    }

    /// Index in the clockwise cycle (North = 0)
    pub fn index(&self) -> usize {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

}

/// Discrete decoded player inputs
///
/// The input-mapping collaborator turns device keys into these; the core
/// never sees raw keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Drop piece one cell down (places it when blocked)
    SoftDrop,
    /// Rotate piece 90° clockwise
    Rotate,
    /// Instantly drop piece to lowest valid position and place it
    HardDrop,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::MoveLeft,
        Action::MoveRight,
        Action::SoftDrop,
        Action::Rotate,
        Action::HardDrop,
    ];

    /// Parse action from its camelCase name (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use stackduel_types::Action;
    ///
    /// assert_eq!(Action::from_str("moveLeft"), Some(Action::MoveLeft));
    /// assert_eq!(Action::from_str("ROTATE"), Some(Action::Rotate));
    /// assert_eq!(Action::from_str("hold"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(Action::MoveLeft),
            "moveright" => Some(Action::MoveRight),
            "softdrop" => Some(Action::SoftDrop),
            "rotate" => Some(Action::Rotate),
            "harddrop" => Some(Action::HardDrop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::MoveLeft => "moveLeft",
            Action::MoveRight => "moveRight",
            Action::SoftDrop => "softDrop",
            Action::Rotate => "rotate",
            Action::HardDrop => "hardDrop",
        }
    }
}

/// Special item carried by one cell of an item piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    /// Removes its own row on placement, counted as a cleared line
    LineClear,
    /// Clears the full row and column through its cell, not counted as a line
    Bomb,
    /// Doubles placement scores for a short time
    DoubleScore,
}

impl ItemKind {
    /// Item code used in the item grid (0 means no item)
    pub fn code(&self) -> u8 {
        match self {
            ItemKind::LineClear => 1,
            ItemKind::Bomb => 2,
            ItemKind::DoubleScore => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ItemKind::LineClear),
            2 => Some(ItemKind::Bomb),
            3 => Some(ItemKind::DoubleScore),
            _ => None,
        }
    }
}

/// A cell on the game board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Locked block of the given piece
    Block(PieceKind),
    /// Filler block injected by an opponent's attack
    Attack,
    /// Bomb item marker
    Bomb,
}

impl Cell {
    /// Integer cell code (0 empty, 1-7 colors, 8 attack, 9 bomb)
    pub fn code(&self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Block(kind) => kind.color_id(),
            Cell::Attack => 8,
            Cell::Bomb => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Cell::Empty),
            8 => Some(Cell::Attack),
            9 => Some(Cell::Bomb),
            c => PieceKind::from_color_id(c).map(Cell::Block),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_attack(&self) -> bool {
        matches!(self, Cell::Attack)
    }
}

/// Difficulty preset supplied by the settings collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Lines needed to advance one level
    pub fn lines_per_level(&self) -> u32 {
        match self {
            Difficulty::Easy => 12,
            Difficulty::Normal => 10,
            Difficulty::Hard => 8,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Match rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    /// Plain battle, standard pieces only
    #[default]
    Normal,
    /// Battle with item pieces every ten cleared lines
    Item,
    /// Battle that ends on a wall-clock deadline, decided by score
    TimeLimit,
}

impl GameMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(GameMode::Normal),
            "item" => Some(GameMode::Item),
            "timelimit" | "time" => Some(GameMode::TimeLimit),
            _ => None,
        }
    }

    pub fn item_mode(&self) -> bool {
        matches!(self, GameMode::Item)
    }
}

/// Key name → action mapping owned by the settings collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    bindings: HashMap<String, Action>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind a key name (case-insensitive) to an action, replacing any previous binding
    pub fn bind(&mut self, key: &str, action: Action) {
        self.bindings.insert(key.to_lowercase(), action);
    }

    pub fn action_for(&self, key: &str) -> Option<Action> {
        self.bindings.get(&key.to_lowercase()).copied()
    }

    pub fn keys_for(&self, action: Action) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .filter(move |(_, a)| **a == action)
            .map(|(k, _)| k.as_str())
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut map = Self::new();
        map.bind("left", Action::MoveLeft);
        map.bind("right", Action::MoveRight);
        map.bind("down", Action::SoftDrop);
        map.bind("up", Action::Rotate);
        map.bind("space", Action::HardDrop);
        map
    }
}

/// Player configuration injected into engines and coordinators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub difficulty: Difficulty,
    pub game_mode: GameMode,
    pub key_map: KeyMap,
    pub time_limit_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            game_mode: GameMode::Normal,
            key_map: KeyMap::default(),
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
        }
    }
}

impl Settings {
    /// Create from environment variables
    ///
    /// - `STACKDUEL_DIFFICULTY`: easy | normal | hard
    /// - `STACKDUEL_MODE`: normal | item | timelimit
    /// - `STACKDUEL_TIME_LIMIT`: seconds for the time-limit mode
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let difficulty = env::var("STACKDUEL_DIFFICULTY")
            .ok()
            .and_then(|s| Difficulty::from_str(&s))
            .unwrap_or(defaults.difficulty);
        let game_mode = env::var("STACKDUEL_MODE")
            .ok()
            .and_then(|s| GameMode::from_str(&s))
            .unwrap_or(defaults.game_mode);
        let time_limit_secs = env::var("STACKDUEL_TIME_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.time_limit_secs);

        Self {
            difficulty,
            game_mode,
            key_map: defaults.key_map,
            time_limit_secs,
        }
    }

    /// Time limit, if the mode has one
    pub fn time_limit(&self) -> Option<std::time::Duration> {
        match self.game_mode {
            GameMode::TimeLimit => Some(std::time::Duration::from_secs(self.time_limit_secs)),
            _ => None,
        }
    }
}
