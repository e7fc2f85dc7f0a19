//! Stackduel (workspace facade crate).
//!
//! Re-exports the member crates as `stackduel::{types, core, battle, net}`;
//! the implementation lives in dedicated crates under `crates/`.

pub use stackduel_battle as battle;
pub use stackduel_core as core;
pub use stackduel_net as net;
pub use stackduel_types as types;
