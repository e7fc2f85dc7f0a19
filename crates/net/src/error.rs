/// Error types for the network session
use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, NetError>;

/// Errors that can occur while establishing or running a session
#[derive(Debug, Error)]
pub enum NetError {
    /// Bind, connect or stream I/O failure
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// A line that is not valid JSON or does not match its payload type
    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    /// Well-formed JSON that breaks the protocol (unknown type, missing field)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Peer rejected the hello or closed before acknowledging it
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Invalid host/port configuration
    #[error("invalid address: {0}")]
    Address(String),

    /// Operation on a session that has been torn down
    #[error("session closed")]
    Closed,
}

