//! Error types for the snag-proto crate.

use thiserror::Error;

/// Errors that can occur while parsing configuration values.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Unknown member of a fixed enumeration.
    #[error("unknown {kind}: {value}")]
    UnknownMember {
        /// Which enumeration was being parsed.
        kind: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtoError>;
