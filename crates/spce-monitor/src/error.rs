//! Error types for the monitoring service.

use spce_client::ClientError;
use thiserror::Error;

/// Errors that can occur while running the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The configuration file could not be parsed as YAML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A controller exchange failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Reading log or configuration file I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A poll cycle could not obtain all three readings.
    #[error("incomplete reading: voltage, current, or pressure missing")]
    IncompleteReading,

    /// The shutdown signal handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(String),
}

/// Result type alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
