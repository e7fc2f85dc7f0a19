//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the single-player simulation: the board model, the
//! piece catalog, the piece randomizer, scoring and the [`Engine`] that ties
//! them together. It has no dependencies on rendering, input devices or I/O.
//!
//! - **Deterministic**: the same seed produces the same piece and item stream
//! - **Fixed storage**: the board is a flat array; line clears do not allocate
//!
//! # Module Structure
//!
//! - [`board`]: 10x20 grid with collision checks, line clearing, item effects
//!   and attack-row injection
//! - [`pieces`]: tetromino and weight shapes, the falling [`Piece`]
//! - [`rng`]: 7-bag random piece generation
//! - [`scoring`]: placement scores, leveling and gravity intervals
//! - [`attack`]: thread-safe inbound [`AttackQueue`]
//! - [`engine`]: the single-player simulation
//! - [`snapshot`]: serializable capture of an engine's visible state
//!
//! # Example
//!
//! ```
//! use stackduel_core::{AttackQueue, Engine, EngineConfig};
//! use stackduel_types::Action;
//!
//! let mut engine = Engine::new(EngineConfig::default(), AttackQueue::new());
//! engine.start();
//!
//! engine.apply_action(Action::MoveRight);
//! engine.apply_action(Action::Rotate);
//! engine.apply_action(Action::HardDrop);
//!
//! let placement = engine.take_last_placement().expect("piece was placed");
//! assert_eq!(placement.lines_cleared, 0);
//! ```
//!
//! # Timing
//!
//! Call [`Engine::tick`] with the elapsed milliseconds. Gravity follows the
//! per-level interval table (1000ms at level 1, floored at 100ms).

pub mod attack;
pub mod board;
pub mod engine;
pub mod pieces;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use stackduel_types as types;

// Re-export commonly used types for convenience
pub use attack::{AttackEntry, AttackQueue};
pub use board::{Board, CodeGrid};
pub use engine::{unix_ms, Engine, EngineConfig, EngineState, Placement};
pub use pieces::{get_shape, rotation_count, ItemTag, Piece};
pub use rng::{PieceQueue, SimpleRng};
pub use snapshot::{GameSnapshot, PieceSnapshot};
