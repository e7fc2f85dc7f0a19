//! Battle coordinator - two engines, two attack queues, one winner
//!
//! The coordinator owns both engines and routes attacks between them:
//! clearing two or more rows in one placement enqueues that many single-row
//! entries into the opponent's queue, tagged with the landing column of the
//! clearing piece. The opponent's engine drains its queue at its own next
//! placement.
//!
//! Winner arbitration runs after every input and every tick. In the time-limit
//! mode a wall-clock deadline also ends the match, decided by score.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::core::{AttackQueue, Engine, EngineConfig, GameSnapshot};
use crate::types::{Action, Settings};

/// Seat in a two-player match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const BOTH: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    pub fn opponent(self) -> Self {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }
}

/// Match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Winner {
    #[default]
    None,
    Player(PlayerId),
    Draw,
}

impl Winner {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Winner::None)
    }

    /// Decide by score: higher wins, equal scores draw
    pub fn by_score(one: u32, two: u32) -> Self {
        match one.cmp(&two) {
            std::cmp::Ordering::Greater => Winner::Player(PlayerId::One),
            std::cmp::Ordering::Less => Winner::Player(PlayerId::Two),
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

/// Two-player match coordinator
#[derive(Debug)]
pub struct Battle {
    settings: Settings,
    engines: [Engine; 2],
    queues: [AttackQueue; 2],
    winner: Winner,
    running: bool,
    paused: bool,
    time_limit: Option<Duration>,
    deadline: Option<Instant>,
    paused_at: Option<Instant>,
}

impl Battle {
    /// Build a match from settings, one RNG seed per player
    pub fn new(settings: Settings, seeds: [u32; 2]) -> Self {
        let queues = [AttackQueue::new(), AttackQueue::new()];
        let engines = [
            Engine::new(
                EngineConfig::from_settings(&settings, seeds[0]),
                queues[0].clone(),
            ),
            Engine::new(
                EngineConfig::from_settings(&settings, seeds[1]),
                queues[1].clone(),
            ),
        ];

        Self {
            time_limit: settings.time_limit(),
            settings,
            engines,
            queues,
            winner: Winner::None,
            running: false,
            paused: false,
            deadline: None,
            paused_at: None,
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Start both engines; the time-limit deadline counts from `now`
    pub fn start_at(&mut self, now: Instant) {
        for queue in &self.queues {
            queue.clear();
        }
        for engine in &mut self.engines {
            engine.start();
        }
        self.winner = Winner::None;
        self.running = true;
        self.paused = false;
        self.paused_at = None;
        self.deadline = self.time_limit.map(|limit| now + limit);
        info!(mode = ?self.settings.game_mode, "battle started");
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    /// Toggle pause on both engines; the deadline is shifted by the paused span
    pub fn pause_at(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        if self.paused {
            if let (Some(deadline), Some(paused_at)) = (self.deadline, self.paused_at.take()) {
                self.deadline = Some(deadline + now.saturating_duration_since(paused_at));
            }
            self.paused = false;
        } else {
            self.paused = true;
            self.paused_at = Some(now);
        }
        for engine in &mut self.engines {
            engine.pause();
        }
    }

    pub fn stop(&mut self) {
        for engine in &mut self.engines {
            engine.stop();
        }
        self.running = false;
        self.paused = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    pub fn engine(&self, player: PlayerId) -> &Engine {
        &self.engines[player.index()]
    }

    #[doc(hidden)]
    pub fn engine_mut(&mut self, player: PlayerId) -> &mut Engine {
        &mut self.engines[player.index()]
    }

    pub fn snapshot(&self, player: PlayerId) -> GameSnapshot {
        self.engine(player).snapshot()
    }

    /// Inbound attack queue of `player`
    pub fn attack_queue(&self, player: PlayerId) -> &AttackQueue {
        &self.queues[player.index()]
    }

    pub fn pending_attacks(&self, player: PlayerId) -> usize {
        self.queues[player.index()].len()
    }

    /// Queue attack rows for `player` without a local clear (e.g. from a remote peer)
    pub fn inject_attack(&self, player: PlayerId, rows: usize, gap_column: u8) {
        self.queues[player.index()].push_rows(rows, gap_column);
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.remaining_time_at(Instant::now())
    }

    /// Time left before the deadline; frozen while paused
    pub fn remaining_time_at(&self, now: Instant) -> Option<Duration> {
        let deadline = self.deadline?;
        let at = self.paused_at.unwrap_or(now);
        Some(deadline.saturating_duration_since(at))
    }

    /// Apply one input for `player`, then route attacks and check for a winner
    pub fn apply_input(&mut self, player: PlayerId, action: Action) -> bool {
        if !self.running || self.paused {
            return false;
        }
        let changed = self.engines[player.index()].apply_action(action);
        self.route_attacks(player);
        self.check_winner();
        changed
    }

    /// Advance both engines by `elapsed_ms`, then poll match state
    pub fn tick(&mut self, elapsed_ms: u32) -> Winner {
        if !self.running || self.paused {
            return self.winner;
        }
        for player in PlayerId::BOTH {
            self.engines[player.index()].tick(elapsed_ms);
            self.route_attacks(player);
        }
        self.update()
    }

    pub fn update(&mut self) -> Winner {
        self.update_at(Instant::now())
    }

    /// Poll for a winner: time limit first, then board state
    pub fn update_at(&mut self, now: Instant) -> Winner {
        if !self.running {
            return self.winner;
        }
        if !self.paused && self.deadline.is_some_and(|deadline| now >= deadline) {
            let winner = Winner::by_score(
                self.engines[0].score(),
                self.engines[1].score(),
            );
            info!(?winner, "time limit reached");
            self.finish(winner);
            return self.winner;
        }
        self.check_winner();
        self.winner
    }

    fn route_attacks(&mut self, player: PlayerId) {
        let Some(placement) = self.engines[player.index()].take_last_placement() else {
            return;
        };
        if placement.lines_cleared < 2 {
            return;
        }
        let target = player.opponent();
        self.queues[target.index()].push_rows(placement.lines_cleared as usize, placement.gap_column);
        debug!(
            from = ?player,
            to = ?target,
            rows = placement.lines_cleared,
            gap_column = placement.gap_column,
            "attack queued"
        );
    }

    fn is_down(&self, player: PlayerId) -> bool {
        let engine = &self.engines[player.index()];
        engine.is_stopped() || !engine.current_fits()
    }

    fn check_winner(&mut self) {
        if !self.running || self.winner.is_decided() {
            return;
        }
        let winner = match (self.is_down(PlayerId::One), self.is_down(PlayerId::Two)) {
            (false, false) => return,
            (true, false) => Winner::Player(PlayerId::Two),
            (false, true) => Winner::Player(PlayerId::One),
            (true, true) => Winner::by_score(self.engines[0].score(), self.engines[1].score()),
        };
        self.finish(winner);
    }

    fn finish(&mut self, winner: Winner) {
        self.winner = winner;
        self.stop();
        info!(
            ?winner,
            score_one = self.engines[0].score(),
            score_two = self.engines[1].score(),
            "battle finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Piece;
    use crate::types::{Cell, GameMode, PieceKind, Rotation};

    fn started(settings: Settings) -> Battle {
        let mut battle = Battle::new(settings, [1, 2]);
        battle.start();
        battle
    }

    /// Fill `rows` bottom rows except column `gap` and give the player a
    /// vertical I that completes them
    fn prepare_clear(battle: &mut Battle, player: PlayerId, rows: i8, gap: i8) {
        let engine = battle.engine_mut(player);
        for y in (20 - rows)..20 {
            for x in 0..10 {
                if x != gap {
                    engine.board_mut().set(x, y, Cell::Block(PieceKind::O));
                }
            }
        }
        let vertical = Piece {
            rotation: Rotation::West,
            ..Piece::new(PieceKind::I)
        };
        engine.set_current(vertical.moved(gap - 4, 0));
    }

    #[test]
    fn test_update_with_both_alive_sets_no_winner() {
        let mut battle = started(Settings::default());
        assert_eq!(battle.update(), Winner::None);
        battle.tick(16);
        assert_eq!(battle.winner(), Winner::None);
        assert!(battle.is_running());
    }

    #[test]
    fn test_stopped_player_loses() {
        let mut battle = started(Settings::default());
        battle.engine_mut(PlayerId::One).stop();
        assert_eq!(battle.update(), Winner::Player(PlayerId::Two));
        assert!(!battle.is_running());
        assert!(battle.engine(PlayerId::Two).is_stopped());
    }

    #[test]
    fn test_both_down_decided_by_score() {
        let mut battle = started(Settings::default());
        battle.engine_mut(PlayerId::One).stop();
        battle.engine_mut(PlayerId::Two).stop();
        assert_eq!(battle.update(), Winner::Draw);
    }

    #[test]
    fn test_single_line_never_attacks() {
        let mut battle = started(Settings::default());
        prepare_clear(&mut battle, PlayerId::One, 1, 3);
        battle.apply_input(PlayerId::One, Action::HardDrop);
        assert_eq!(battle.engine(PlayerId::One).lines(), 1);
        assert_eq!(battle.pending_attacks(PlayerId::Two), 0);
    }

    #[test]
    fn test_multi_line_clear_enqueues_one_entry_per_row() {
        let mut battle = started(Settings::default());
        prepare_clear(&mut battle, PlayerId::One, 3, 5);
        battle.apply_input(PlayerId::One, Action::HardDrop);
        assert_eq!(battle.pending_attacks(PlayerId::Two), 3);

        let queue = battle.attack_queue(PlayerId::Two);
        for _ in 0..3 {
            let entry = queue.pop().unwrap();
            assert_eq!((entry.rows, entry.gap_column), (1, 5));
        }
    }

    #[test]
    fn test_inputs_ignored_while_paused() {
        let mut battle = started(Settings::default());
        battle.pause();
        assert!(battle.is_paused());
        assert!(!battle.apply_input(PlayerId::One, Action::MoveLeft));
        battle.pause();
        assert!(battle.apply_input(PlayerId::One, Action::MoveLeft));
    }

    #[test]
    fn test_time_limit_decides_by_score() {
        let settings = Settings {
            game_mode: GameMode::TimeLimit,
            time_limit_secs: 60,
            ..Settings::default()
        };
        let t0 = Instant::now();
        let mut battle = Battle::new(settings, [1, 2]);
        battle.start_at(t0);
        prepare_clear(&mut battle, PlayerId::Two, 1, 0);
        battle.apply_input(PlayerId::Two, Action::HardDrop);

        assert_eq!(battle.update_at(t0 + Duration::from_secs(59)), Winner::None);
        assert_eq!(
            battle.remaining_time_at(t0 + Duration::from_secs(59)),
            Some(Duration::from_secs(1))
        );
        assert_eq!(
            battle.update_at(t0 + Duration::from_secs(60)),
            Winner::Player(PlayerId::Two)
        );
        assert!(!battle.is_running());
    }

    #[test]
    fn test_pause_shifts_deadline() {
        let settings = Settings {
            game_mode: GameMode::TimeLimit,
            time_limit_secs: 10,
            ..Settings::default()
        };
        let t0 = Instant::now();
        let mut battle = Battle::new(settings, [1, 2]);
        battle.start_at(t0);
        battle.pause_at(t0 + Duration::from_secs(5));
        assert_eq!(
            battle.remaining_time_at(t0 + Duration::from_secs(30)),
            Some(Duration::from_secs(5))
        );
        battle.pause_at(t0 + Duration::from_secs(25));
        assert_eq!(battle.update_at(t0 + Duration::from_secs(29)), Winner::None);
        assert_eq!(battle.update_at(t0 + Duration::from_secs(30)), Winner::Draw);
    }

    #[test]
    fn test_no_deadline_outside_time_limit_mode() {
        let battle = started(Settings::default());
        assert_eq!(battle.remaining_time(), None);
    }
}
