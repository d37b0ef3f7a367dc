//! Error types for the SDK bridge adapter

use playground_application::{ChatError, IdentityError};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur when talking to the SDK bridge process
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to spawn chat bridge '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Bridge I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error object returned by the bridge; the SDK's message is shown as-is.
    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Chat bridge closed the connection")]
    TransportClosed,
}

impl From<BridgeError> for IdentityError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Rpc { message, .. } => IdentityError::Rejected(message),
            other => IdentityError::Transport(other.to_string()),
        }
    }
}

impl From<BridgeError> for ChatError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Rpc { message, .. } => ChatError::Remote(message),
            other => ChatError::Transport(other.to_string()),
        }
    }
}
