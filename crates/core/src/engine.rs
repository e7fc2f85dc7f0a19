//! Engine module - single-player simulation
//!
//! An [`Engine`] drives one [`Board`] with one piece stream: movement and
//! rotation with naive rollback, gravity, placement (items, line clears,
//! scoring, leveling), item cadence and the application of queued attack rows.
//!
//! Lifecycle: `NotStarted → Running ⇄ Paused → Stopped`. A stopped engine is
//! game over; starting it again begins a fresh game with the same seed.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::attack::AttackQueue;
use crate::board::Board;
use crate::pieces::Piece;
use crate::rng::{PieceQueue, SimpleRng};
use crate::scoring::{calculate_line_score, get_drop_interval_ms, level_for_lines};
use crate::snapshot::{GameSnapshot, PieceSnapshot};
use crate::types::{
    Action, Difficulty, ItemKind, PieceKind, Settings, BOARD_WIDTH, DOUBLE_SCORE_MS,
    ITEM_LINE_INTERVAL,
};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    #[default]
    NotStarted,
    Running,
    Paused,
    Stopped,
}

/// Per-engine configuration, derived from [`Settings`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub difficulty: Difficulty,
    pub item_mode: bool,
    pub seed: u32,
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings, seed: u32) -> Self {
        Self {
            difficulty: settings.difficulty,
            item_mode: settings.game_mode.item_mode(),
            seed,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            item_mode: false,
            seed: 1,
        }
    }
}

/// Outcome of one placement, consumed by whoever routes attacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Rows removed by the placement (line-clear item rows included)
    pub lines_cleared: u32,
    /// Column of the placed piece's last cell
    pub gap_column: u8,
}

/// Single-player game simulation
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    board: Board,
    current: Option<Piece>,
    next: Piece,
    piece_queue: PieceQueue,
    item_rng: SimpleRng,
    state: EngineState,
    score: u32,
    lines: u32,
    lines_since_item: u32,
    double_score_ms: u32,
    drop_timer_ms: u32,
    attacks: AttackQueue,
    last_placement: Option<Placement>,
}

impl Engine {
    /// Create an engine that drains attack rows from `attacks`
    pub fn new(config: EngineConfig, attacks: AttackQueue) -> Self {
        let mut piece_queue = PieceQueue::new(config.seed);
        let next = Piece::new(piece_queue.draw());

        Self {
            config,
            board: Board::new(),
            current: None,
            next,
            piece_queue,
            item_rng: SimpleRng::new(config.seed.rotate_left(16) ^ 0x5bd1_e995),
            state: EngineState::NotStarted,
            score: 0,
            lines: 0,
            lines_since_item: 0,
            double_score_ms: 0,
            drop_timer_ms: 0,
            attacks,
            last_placement: None,
        }
    }

    /// Start the game and spawn the first piece
    ///
    /// A stopped engine is reset into a fresh game first. No-op while running
    /// or paused.
    pub fn start(&mut self) {
        match self.state {
            EngineState::Running | EngineState::Paused => return,
            EngineState::Stopped => {
                self.attacks.clear();
                *self = Self::new(self.config, self.attacks.clone());
            }
            EngineState::NotStarted => {}
        }
        self.state = EngineState::Running;
        self.spawn_next();
        if !self.current_fits() {
            self.game_over();
        }
    }

    /// Toggle between running and paused
    pub fn pause(&mut self) {
        self.state = match self.state {
            EngineState::Running => EngineState::Paused,
            EngineState::Paused => EngineState::Running,
            other => other,
        };
    }

    pub fn stop(&mut self) {
        self.state = EngineState::Stopped;
    }

    fn game_over(&mut self) {
        if self.state != EngineState::Stopped {
            info!(score = self.score, lines = self.lines, "game over");
        }
        self.state = EngineState::Stopped;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == EngineState::Stopped
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    #[doc(hidden)]
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn current(&self) -> Option<&Piece> {
        self.current.as_ref()
    }

    /// Replace the falling piece (scripted setups and tests)
    #[doc(hidden)]
    pub fn set_current(&mut self, piece: Piece) {
        self.current = Some(piece);
    }

    pub fn next(&self) -> &Piece {
        &self.next
    }

    #[doc(hidden)]
    pub fn set_next(&mut self, piece: Piece) {
        self.next = piece;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    /// Current level (starts at 1)
    pub fn level(&self) -> u32 {
        level_for_lines(self.lines, self.config.difficulty.lines_per_level())
    }

    pub fn lines_since_item(&self) -> u32 {
        self.lines_since_item
    }

    pub fn double_score_active(&self) -> bool {
        self.double_score_ms > 0
    }

    pub fn double_score_remaining_ms(&self) -> u32 {
        self.double_score_ms
    }

    pub fn drop_interval_ms(&self) -> u32 {
        get_drop_interval_ms(self.level())
    }

    /// Inbound attack queue of this engine
    pub fn attack_queue(&self) -> &AttackQueue {
        &self.attacks
    }

    pub fn pending_attacks(&self) -> usize {
        self.attacks.len()
    }

    /// Whether the falling piece fits where it is; false when there is none
    pub fn current_fits(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|p| self.board.is_valid_position(p))
    }

    /// Take and clear the result of the last placement
    pub fn take_last_placement(&mut self) -> Option<Placement> {
        self.last_placement.take()
    }

    /// Apply a player action; returns false if nothing happened
    pub fn apply_action(&mut self, action: Action) -> bool {
        if self.state != EngineState::Running || self.current.is_none() {
            return false;
        }
        match action {
            Action::MoveLeft => self.try_move(-1),
            Action::MoveRight => self.try_move(1),
            Action::Rotate => self.rotate(),
            Action::SoftDrop => {
                self.move_piece_down();
                true
            }
            Action::HardDrop => self.hard_drop(),
        }
    }

    fn try_move(&mut self, dx: i8) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        if piece.is_weight() && piece.landed {
            return false;
        }
        let moved = piece.moved(dx, 0);
        if self.board.is_valid_position(&moved) {
            self.current = Some(moved);
            true
        } else {
            false
        }
    }

    fn rotate(&mut self) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        let rotated = piece.rotated();
        if rotated == piece || !self.board.is_valid_position(&rotated) {
            return false;
        }
        self.current = Some(rotated);
        true
    }

    /// Advance the falling piece one row, placing it when blocked
    ///
    /// Returns true if the piece moved down.
    pub fn move_piece_down(&mut self) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        let Some(mut piece) = self.current else {
            return false;
        };

        if piece.is_weight() {
            if !piece.landed && self.board.process_weight_effect(&mut piece) {
                self.current = Some(piece);
                return true;
            }
            self.current = Some(piece);
            self.place_current();
            return false;
        }

        let moved = piece.moved(0, 1);
        if self.board.is_valid_position(&moved) {
            self.current = Some(moved);
            true
        } else {
            self.place_current();
            false
        }
    }

    fn hard_drop(&mut self) -> bool {
        let Some(mut piece) = self.current else {
            return false;
        };
        if piece.is_weight() {
            while self.board.process_weight_effect(&mut piece) {}
        } else {
            while self.board.is_valid_position(&piece.moved(0, 1)) {
                piece = piece.moved(0, 1);
            }
        }
        self.current = Some(piece);
        self.place_current();
        true
    }

    /// Lock the falling piece and resolve everything that follows from it
    fn place_current(&mut self) {
        let Some(mut piece) = self.current.take() else {
            return;
        };

        self.board.place_piece(&mut piece);
        let mut cleared = self.board.process_item_effects(&piece);
        cleared += self.board.clear_lines();

        if cleared > 0 {
            self.score = self.score.saturating_add(calculate_line_score(
                cleared,
                self.level(),
                self.double_score_active(),
            ));
            self.lines += cleared as u32;
            self.lines_since_item += cleared as u32;
        }
        if piece.item.is_some_and(|tag| tag.kind == ItemKind::DoubleScore) {
            self.double_score_ms = DOUBLE_SCORE_MS;
        }

        let gap_column = piece.landing_column().clamp(0, BOARD_WIDTH as i8 - 1) as u8;
        self.last_placement = Some(Placement {
            lines_cleared: cleared as u32,
            gap_column,
        });
        debug!(kind = ?piece.kind, cleared, gap_column, score = self.score, "piece placed");

        self.spawn_next();
        self.apply_pending_attacks();

        if !self.current_fits() {
            self.game_over();
        }
    }

    /// Promote the pre-generated next piece and generate a new one
    fn spawn_next(&mut self) {
        let next = self.generate_piece();
        self.current = Some(std::mem::replace(&mut self.next, next));
        self.drop_timer_ms = 0;
    }

    fn generate_piece(&mut self) -> Piece {
        if self.config.item_mode && self.lines_since_item >= ITEM_LINE_INTERVAL {
            self.lines_since_item = 0;
            let item = match self.item_rng.next_range(4) {
                0 => ItemKind::LineClear,
                1 => ItemKind::Bomb,
                2 => ItemKind::DoubleScore,
                _ => return Piece::new(PieceKind::Weight),
            };
            let kind = self.piece_queue.draw();
            let cell = self.item_rng.next_range(4) as usize;
            return Piece::with_item(kind, cell, item);
        }
        Piece::new(self.piece_queue.draw())
    }

    /// Drain queued attack rows into the board one row at a time
    ///
    /// The falling piece is re-validated after every row; the engine is
    /// stopped as soon as it no longer fits.
    fn apply_pending_attacks(&mut self) {
        let mut applied = 0usize;
        while let Some(entry) = self.attacks.pop() {
            self.board
                .add_attack_lines(entry.rows as usize, entry.gap_column as usize);
            applied += entry.rows as usize;
            if !self.current_fits() {
                self.game_over();
                break;
            }
        }
        if applied > 0 {
            debug!(rows = applied, total = self.board.attack_line_count(), "attack rows applied");
        }
    }

    /// Advance engine time: gravity and the double-score timer
    ///
    /// Returns true if gravity moved or placed the piece.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.state != EngineState::Running {
            return false;
        }

        self.double_score_ms = self.double_score_ms.saturating_sub(elapsed_ms);

        if self.current.is_none() {
            return false;
        }

        self.drop_timer_ms += elapsed_ms;
        if self.drop_timer_ms >= self.drop_interval_ms() {
            self.drop_timer_ms = 0;
            self.move_piece_down();
            return true;
        }
        false
    }

    /// Capture the visible state
    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        self.board.write_code_grid(&mut out.board);
        self.board.write_item_grid(&mut out.items);
        out.score = self.score;
        out.level = self.level();
        out.lines = self.lines;
        out.current = self.current.map(PieceSnapshot::from);
        out.next = Some(PieceSnapshot::from(self.next));
        out.pending_attacks = self.pending_attacks() as u32;
        out.game_over = self.is_stopped();
        out.captured_at_ms = unix_ms();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), AttackQueue::new())
    }
}

/// Current wall-clock time in Unix milliseconds
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, Rotation};

    fn started(seed: u32) -> Engine {
        let mut engine = Engine::new(
            EngineConfig {
                seed,
                ..EngineConfig::default()
            },
            AttackQueue::new(),
        );
        engine.start();
        engine
    }

    fn fill_rows_except(engine: &mut Engine, rows: std::ops::Range<i8>, gap: i8) {
        for y in rows {
            for x in 0..10 {
                if x != gap {
                    engine.board_mut().set(x, y, Cell::Block(PieceKind::O));
                }
            }
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut engine = Engine::default();
        assert_eq!(engine.state(), EngineState::NotStarted);
        assert!(!engine.apply_action(Action::MoveLeft));

        engine.start();
        assert!(engine.is_running());
        assert!(engine.current().is_some());

        engine.pause();
        assert!(engine.is_paused());
        assert!(!engine.apply_action(Action::MoveLeft));
        assert!(!engine.tick(5_000));

        engine.pause();
        assert!(engine.is_running());

        engine.stop();
        assert!(engine.is_stopped());
        engine.pause();
        assert!(engine.is_stopped());
    }

    #[test]
    fn test_restart_after_stop_resets() {
        let mut engine = started(7);
        engine.apply_action(Action::HardDrop);
        engine.stop();
        engine.start();
        assert!(engine.is_running());
        assert_eq!(engine.score(), 0);
        assert!(engine.board().cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_move_rolls_back_at_wall() {
        let mut engine = started(1);
        let mut moves = 0;
        while engine.apply_action(Action::MoveLeft) {
            moves += 1;
            assert!(moves < 10);
        }
        let x = engine.current().unwrap().x;
        assert!(!engine.apply_action(Action::MoveLeft));
        assert_eq!(engine.current().unwrap().x, x);
    }

    #[test]
    fn test_rotation_rolls_back_when_blocked() {
        let mut engine = started(1);
        engine.set_current(Piece::new(PieceKind::I).moved(0, 17));
        // East I would need rows 17..=20
        assert!(!engine.apply_action(Action::Rotate));
        assert_eq!(engine.current().unwrap().rotation, Rotation::North);
    }

    #[test]
    fn test_i_piece_into_well_clears_one_line() {
        let mut engine = started(3);
        fill_rows_except(&mut engine, 19..20, 3);
        let vertical = Piece {
            rotation: Rotation::West,
            ..Piece::new(PieceKind::I)
        };
        // West I occupies column x + 1
        engine.set_current(vertical.moved(-1, 0));
        assert!(engine.apply_action(Action::HardDrop));

        let placement = engine.take_last_placement().unwrap();
        assert_eq!(placement.lines_cleared, 1);
        assert_eq!(placement.gap_column, 3);
        assert_eq!(engine.score(), 100);
        assert_eq!(engine.lines(), 1);
        assert!(engine.take_last_placement().is_none());
    }

    #[test]
    fn test_four_lines_score_800_times_level() {
        let mut engine = started(3);
        fill_rows_except(&mut engine, 16..20, 0);
        let vertical = Piece {
            rotation: Rotation::West,
            ..Piece::new(PieceKind::I)
        };
        engine.set_current(vertical.moved(-4, 0));
        engine.apply_action(Action::HardDrop);
        assert_eq!(engine.take_last_placement().unwrap().lines_cleared, 4);
        assert_eq!(engine.score(), 800);
    }

    #[test]
    fn test_double_score_doubles_and_expires() {
        let mut engine = started(3);
        engine.double_score_ms = DOUBLE_SCORE_MS;
        fill_rows_except(&mut engine, 19..20, 3);
        let vertical = Piece {
            rotation: Rotation::West,
            ..Piece::new(PieceKind::I)
        };
        engine.set_current(vertical.moved(-1, 0));
        engine.apply_action(Action::HardDrop);
        assert_eq!(engine.score(), 200);

        engine.tick(DOUBLE_SCORE_MS);
        assert!(!engine.double_score_active());
    }

    #[test]
    fn test_gravity_uses_level_interval() {
        let mut engine = started(9);
        let y = engine.current().unwrap().y;
        assert!(!engine.tick(999));
        assert!(engine.tick(1));
        assert_eq!(engine.current().unwrap().y, y + 1);
    }

    #[test]
    fn test_attacks_drain_at_next_placement() {
        let mut engine = started(5);
        engine.attack_queue().push_rows(2, 6);
        assert_eq!(engine.pending_attacks(), 2);
        assert_eq!(engine.board().attack_line_count(), 0);

        engine.apply_action(Action::HardDrop);
        assert_eq!(engine.pending_attacks(), 0);
        assert_eq!(engine.board().attack_line_count(), 2);
        assert_eq!(engine.board().get(6, 19), Some(Cell::Empty));
        assert_eq!(engine.board().get(5, 19), Some(Cell::Attack));
    }

    #[test]
    fn test_attack_that_buries_current_piece_ends_game() {
        let mut engine = started(5);
        // Leave only the top two rows free; any attack pushes into the spawn area
        fill_rows_except(&mut engine, 2..20, 9);
        engine.attack_queue().push_rows(3, 0);
        engine.set_current(Piece::new(PieceKind::O));
        engine.apply_action(Action::HardDrop);
        assert!(engine.is_stopped());
    }

    #[test]
    fn test_item_piece_after_ten_lines() {
        let mut engine = Engine::new(
            EngineConfig {
                item_mode: true,
                seed: 11,
                ..EngineConfig::default()
            },
            AttackQueue::new(),
        );
        engine.start();
        engine.lines_since_item = ITEM_LINE_INTERVAL;
        engine.apply_action(Action::HardDrop);
        // The piece generated at this placement is the new "next"
        let next = *engine.next();
        assert!(next.item.is_some() || next.is_weight());
        assert_eq!(engine.lines_since_item(), 0);
    }

    #[test]
    fn test_no_items_outside_item_mode() {
        let mut engine = started(11);
        engine.lines_since_item = ITEM_LINE_INTERVAL;
        engine.apply_action(Action::HardDrop);
        assert!(engine.next().item.is_none());
        assert!(!engine.next().is_weight());
    }

    #[test]
    fn test_weight_cannot_strafe_after_landing() {
        let mut engine = started(1);
        fill_rows_except(&mut engine, 15..20, -1);
        engine.set_current(Piece::new(PieceKind::Weight));
        while engine.current().is_some_and(|p| p.is_weight() && !p.landed) {
            engine.move_piece_down();
        }
        let weight = *engine.current().unwrap();
        assert!(weight.landed);
        assert!(!engine.apply_action(Action::MoveLeft));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut engine = started(2);
        engine.attack_queue().push_rows(3, 1);
        let snap = engine.snapshot();
        assert_eq!(snap.pending_attacks, 3);
        assert_eq!(snap.level, 1);
        assert!(snap.current.is_some());
        assert!(snap.next.is_some());
        assert!(snap.captured_at_ms > 0);
        assert!(!snap.game_over);
    }
}
