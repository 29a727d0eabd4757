//! # Common Error Types
//!
//! Consolidated error handling for the chat client.
//!
//! ## Error Categories
//!
//! - **REST**: `Network`, `Http`, `Unauthorized`, `Decode`
//! - **Push transport**: `Transport`, `Disconnected`, `Timeout`, `Rejected`
//! - **Local**: `Validation`, `State`, `Config`, `Io`
//!
//! ## Usage Pattern
//!
//! ```rust,no_run
//! use chat_client::core::error::{ChatError, Result};
//!
//! fn require_text(text: &str) -> Result<&str> {
//!     let text = text.trim();
//!     if text.is_empty() {
//!         return Err(ChatError::Validation("Message cannot be empty".to_string()));
//!     }
//!     Ok(text)
//! }
//! ```

use thiserror::Error;

/// Chat-client error covering REST, push transport and local failures.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Request never produced a response (connection refused, DNS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Backend rejected the bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response body or push frame did not match the expected shape.
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// WebSocket-level failure (handshake, write, protocol).
    #[error("Transport error: {0}")]
    Transport(String),

    /// No live connection, or it dropped while a command awaited its ack.
    #[error("Not connected to chat server")]
    Disconnected,

    /// No acknowledgement arrived within the ack timeout.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// Backend acknowledged the command negatively.
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// Invalid user input (empty message, unknown conversation).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not valid in the current client state.
    #[error("State error: {0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Errors a retry could plausibly fix
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChatError::Network(_) | ChatError::Disconnected | ChatError::Timeout(_) | ChatError::Transport(_)
        ) || matches!(self, ChatError::Http { status, .. } if *status >= 500)
    }
}

/// Convenience type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChatError::Decode(err.to_string())
        } else {
            ChatError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Decode(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChatError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ChatError::Http { status: 404, message: "Chat not found".into() };
        assert_eq!(err.to_string(), "API error (404): Chat not found");
        assert_eq!(ChatError::Disconnected.to_string(), "Not connected to chat server");
        assert_eq!(
            ChatError::Timeout("message:send".into()).to_string(),
            "Timed out waiting for message:send"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ChatError::Disconnected.is_transient());
        assert!(ChatError::Http { status: 503, message: String::new() }.is_transient());
        assert!(!ChatError::Http { status: 400, message: String::new() }.is_transient());
        assert!(!ChatError::Validation("empty".into()).is_transient());
        assert!(!ChatError::Unauthorized("expired".into()).is_transient());
    }

    #[test]
    fn test_json_error_maps_to_decode() {
        let err: ChatError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ChatError::Decode(_)));
    }
}
