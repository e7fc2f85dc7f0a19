//! Two-player battle layer
//!
//! - [`battle`]: the coordinator that owns both engines, routes attacks and
//!   arbitrates the winner (with an optional time limit)
//! - [`search`]: placement search and board evaluation on a private copy
//! - [`ai`]: the heuristic opponent that plays one seat through the search
//!
//! # Example
//!
//! ```
//! use stackduel_battle::{Battle, HeuristicOpponent, PlayerId, Winner};
//! use stackduel_types::Settings;
//!
//! let mut battle = Battle::new(Settings::default(), [1, 2]);
//! battle.start();
//!
//! let mut ai = HeuristicOpponent::new(7);
//! for _ in 0..100 {
//!     ai.step(16, &mut battle, PlayerId::Two);
//!     battle.tick(16);
//! }
//! assert!(matches!(battle.winner(), Winner::None) || !battle.is_running());
//! ```

pub mod ai;
pub mod battle;
pub mod search;

pub use stackduel_core as core;
pub use stackduel_types as types;

pub use ai::{HeuristicOpponent, OpponentConfig};
pub use battle::{Battle, PlayerId, Winner};
pub use search::{best_placement, BoardFeatures, Candidate, Weights};
