//! Error types for controller clients.

use spce_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur when exchanging commands with the instrument.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A protocol-level failure: argument validation, frame parsing,
    /// checksum or address mismatch.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport has no established connection; no I/O was
    /// attempted.
    #[error("not connected to the instrument")]
    NotConnected,

    /// The connection could not be established or was reset during an
    /// exchange.
    #[error("connection error: {0}")]
    Connection(String),

    /// No response arrived within the configured read timeout.
    #[error("timeout waiting for response")]
    Timeout,

    /// The instrument answered with an `ER` frame.
    #[error("instrument returned error code {code:02X}")]
    Instrument { code: u8 },
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
