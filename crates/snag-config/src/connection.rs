//! Connection test outcome.

use serde::{Deserialize, Serialize};

/// Shown when the connection test succeeds without a server message.
pub const CONNECTION_OK_MESSAGE: &str = "Connection successful. Bugsnag credentials look valid.";

/// Shown when the connection test fails without a server message.
pub const CONNECTION_FAILED_MESSAGE: &str =
    "Connection failed. Please verify the API token and organization ID.";

/// Whether the credentials were accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// The server answered 2xx.
    Success,
    /// Non-2xx answer or no answer at all.
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of a connection test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCheck {
    /// Outcome.
    pub status: ConnectionStatus,
    /// Text to show next to the test control.
    pub message: String,
}

impl ConnectionCheck {
    /// A successful check, using the default text when the server sent none.
    #[must_use]
    pub fn success(message: Option<String>) -> Self {
        Self {
            status: ConnectionStatus::Success,
            message: message.unwrap_or_else(|| CONNECTION_OK_MESSAGE.to_string()),
        }
    }

    /// A failed check, using the default text when no message is available.
    #[must_use]
    pub fn failure(message: Option<String>) -> Self {
        Self {
            status: ConnectionStatus::Error,
            message: message.unwrap_or_else(|| CONNECTION_FAILED_MESSAGE.to_string()),
        }
    }

    /// Returns true if the credentials were accepted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, ConnectionStatus::Success)
    }
}
