//! Error types for the SPCe wire protocol.

use thiserror::Error;

/// Errors that can occur when building or parsing protocol frames.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// A command argument is outside its allowed domain. Raised before
    /// any frame is built.
    #[error("invalid {argument}: {value} (allowed: {allowed})")]
    Validation {
        /// Name of the offending argument.
        argument: &'static str,
        /// The rejected value, rendered as text.
        value: String,
        /// Human-readable description of the accepted range or set.
        allowed: &'static str,
    },

    /// A frame could not be parsed.
    #[error("malformed frame: {0}")]
    Parse(String),

    /// A response frame carried a checksum that does not match the one
    /// computed over its body.
    #[error("checksum mismatch: computed {expected:02X}, frame says {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// A response frame came from a different bus address than the one
    /// the request was sent to.
    #[error("bus address mismatch: expected {expected:02X}, got {actual:02X}")]
    AddressMismatch { expected: u8, actual: u8 },
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
