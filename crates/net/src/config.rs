//! Session configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{NetError, Result};
use crate::protocol::PROTOCOL_VERSION;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Interval between outbound pings
    pub ping_interval: Duration,
    /// Minimum spacing of outbound state updates
    pub state_interval: Duration,
    /// Consecutive read failures tolerated before the session gives up
    pub max_transient_failures: u32,
    pub protocol_version: String,
    pub player_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            ping_interval: Duration::from_secs(1),
            state_interval: Duration::from_millis(50),
            max_transient_failures: 3,
            protocol_version: PROTOCOL_VERSION.to_string(),
            player_name: "player".to_string(),
        }
    }
}

impl SessionConfig {
    /// Create from environment variables
    ///
    /// - `STACKDUEL_HOST`: bind or connect host (default 127.0.0.1)
    /// - `STACKDUEL_PORT`: port (default 7878)
    /// - `STACKDUEL_NAME`: player name announced in the hello
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("STACKDUEL_HOST").unwrap_or(defaults.host);
        let port = env::var("STACKDUEL_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let player_name = env::var("STACKDUEL_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.player_name);

        Self {
            host,
            port,
            player_name,
            ..defaults
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| NetError::Address(format!("{}:{}", self.host, self.port)))
    }
}
