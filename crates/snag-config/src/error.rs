//! Error types for the snag-config crate.

use thiserror::Error;

/// Errors surfaced by catalog fetches, mapping loads, saves and configuration.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced an HTTP response.
    #[error("transport error: {message}")]
    Transport {
        /// Message of the underlying transport failure.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the `{error}` or `{message}` body, when present.
        message: Option<String>,
    },

    /// A 2xx response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A save was requested while another one is still in flight.
    #[error("a save is already in progress")]
    SaveInFlight,

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// The text to show the user for this failure.
    ///
    /// Server-supplied messages win over `default`; transport failures show
    /// their own message.
    #[must_use]
    pub fn user_message(&self, default: &str) -> String {
        match self {
            Self::Transport { message } => message.clone(),
            Self::Server {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Server { message: None, .. } | Self::Decode(_) => default.to_string(),
            Self::SaveInFlight | Self::Config(_) => self.to_string(),
        }
    }

    /// Returns true for failures that never reached the server.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Error for a failed round trip at the transport level.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// Description of the failure.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.message,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_wins_over_default() {
        let err = SyncError::Server {
            status: 500,
            message: Some("db down".to_string()),
        };
        assert_eq!(err.user_message("Failed to save"), "db down");
    }

    #[test]
    fn server_without_message_uses_default() {
        let err = SyncError::Server {
            status: 502,
            message: None,
        };
        assert_eq!(err.user_message("Failed to save"), "Failed to save");
        assert_eq!(err.to_string(), "server error (502): no message");
    }

    #[test]
    fn transport_keeps_own_message() {
        let err: SyncError = TransportError::new("connection refused").into();
        assert!(err.is_transport());
        assert_eq!(err.user_message("Failed to save"), "connection refused");
    }

    #[test]
    fn error_display_save_in_flight() {
        assert_eq!(
            SyncError::SaveInFlight.to_string(),
            "a save is already in progress"
        );
    }
}
