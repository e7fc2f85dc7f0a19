//! Heuristic opponent
//!
//! Plays one seat by searching placements for the current piece and walking
//! toward the best one with a single input per decision: rotate while the
//! rotation is off-target, otherwise strafe one cell, otherwise hard-drop.
//! Decisions are spaced by a randomized interval so the opponent reads as a
//! human-paced player.

use tracing::trace;

use crate::battle::{Battle, PlayerId};
use crate::core::{Engine, SimpleRng};
use crate::search::{best_placement, Candidate, Weights};
use crate::types::Action;

/// Decision pacing and evaluation weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentConfig {
    pub min_interval_ms: u32,
    pub max_interval_ms: u32,
    pub weights: Weights,
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 500,
            max_interval_ms: 1000,
            weights: Weights::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeuristicOpponent {
    config: OpponentConfig,
    rng: SimpleRng,
    elapsed_ms: u32,
    interval_ms: u32,
    target: Option<Candidate>,
}

impl HeuristicOpponent {
    pub fn new(seed: u32) -> Self {
        Self::with_config(OpponentConfig::default(), seed)
    }

    pub fn with_config(config: OpponentConfig, seed: u32) -> Self {
        let mut rng = SimpleRng::new(seed);
        let interval_ms = rng.next_between(config.min_interval_ms, config.max_interval_ms);
        Self {
            config,
            rng,
            elapsed_ms: 0,
            interval_ms,
            target: None,
        }
    }

    /// Interval until the next decision
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Placement chosen at the last decision
    pub fn target(&self) -> Option<Candidate> {
        self.target
    }

    /// Advance the decision clock; true when a decision is due
    pub fn poll(&mut self, elapsed_ms: u32) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
        if self.elapsed_ms < self.interval_ms {
            return false;
        }
        self.elapsed_ms = 0;
        self.interval_ms = self
            .rng
            .next_between(self.config.min_interval_ms, self.config.max_interval_ms);
        true
    }

    /// Choose the next input for `engine`
    ///
    /// Returns `None` when the engine has no piece in play. When no placement
    /// is valid the opponent soft-drops instead of stalling.
    pub fn decide(&mut self, engine: &Engine) -> Option<Action> {
        if !engine.is_running() {
            return None;
        }
        let piece = *engine.current()?;

        self.target = best_placement(engine.board(), &piece, &self.config.weights);
        let action = match self.target {
            None => Action::SoftDrop,
            Some(target) if target.rotation != piece.rotation => Action::Rotate,
            Some(target) if target.x < piece.x => Action::MoveLeft,
            Some(target) if target.x > piece.x => Action::MoveRight,
            Some(_) => Action::HardDrop,
        };
        trace!(?action, target = ?self.target, "opponent decision");
        Some(action)
    }

    /// Advance by `elapsed_ms` and, when due, play one input for `player`
    pub fn step(&mut self, elapsed_ms: u32, battle: &mut Battle, player: PlayerId) -> Option<Action> {
        if !self.poll(elapsed_ms) {
            return None;
        }
        let action = self.decide(battle.engine(player))?;
        battle.apply_input(player, action);
        Some(action)
    }
}
