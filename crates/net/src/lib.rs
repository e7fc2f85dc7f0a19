//! Duplex network play
//!
//! - [`protocol`]: line-delimited JSON messages and their codec
//! - [`session`]: the async two-peer session (handshake, ping/pong RTT,
//!   receive loop, serialized writer)
//! - [`throttle`]: rate limiting of outbound state updates
//! - [`runtime`]: [`NetLink`], a sync handle owning its own tokio runtime
//! - [`duel`]: [`RemoteDuel`], a local engine playing against a peer
//!
//! # Example
//!
//! ```no_run
//! use stackduel_net::core::AttackQueue;
//! use stackduel_net::{NetLink, RemoteDuel, Role, SessionConfig};
//! use stackduel_net::types::{Action, Settings};
//!
//! # fn main() -> anyhow::Result<()> {
//! let attacks = AttackQueue::new();
//! let link = NetLink::connect(&SessionConfig::from_env(), attacks.clone())?;
//! let mut duel = RemoteDuel::new(Role::Client, &Settings::default(), 1, attacks, link);
//! duel.start();
//! duel.apply_input(Action::HardDrop);
//! duel.tick(16);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod duel;
pub mod error;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod throttle;

pub use stackduel_battle as battle;
pub use stackduel_core as core;
pub use stackduel_types as types;

pub use config::SessionConfig;
pub use duel::{announce_match, await_match, await_ready, PeerLink, Rematch, RemoteDuel};
pub use error::{NetError, Result};
pub use protocol::{decode, encode, Message, NetworkMessage, PROTOCOL_VERSION};
pub use runtime::NetLink;
pub use session::{Role, Session, SessionEvent};
pub use throttle::StateThrottle;
