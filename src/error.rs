//! Custom error types for the driver.
//!
//! This module defines the primary error type, `DaqError`. Using the `thiserror` crate, it
//! provides a single place for every failure the driver can surface to its host.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment`, typically file parsing or type mismatches in
//!   the configuration file or environment overrides.
//! - **`Configuration`**: Semantic errors in an otherwise well-formed configuration (for
//!   example a serial transport with no port name). Caught by `CsvStreamConfig::validate`.
//! - **`Io`**: Wraps `std::io::Error` from file access.
//! - **`Transport`** / **`TransportClosed`**: Unrecoverable line transport failures. These are
//!   the only errors `acquire_data` ever returns.
//! - **`Session`** / **`SessionFormat`**: Problems reading or writing saved sessions.
//!
//! Malformed protocol lines are deliberately absent from this list: the stream is
//! self-synchronising, so bad lines are dropped where they are decoded.

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

#[derive(Error, Debug)]
pub enum DaqError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport closed: no more lines will arrive")]
    TransportClosed,

    #[error("Serial port not connected")]
    SerialPortNotConnected,

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    #[error("Session file error: {0}")]
    Session(#[from] serde_yaml::Error),

    #[error("Session format error: {0}")]
    SessionFormat(String),
}

impl DaqError {
    /// Whether the host may keep polling the transport after this error.
    ///
    /// Only a missing connection is retryable; everything else ends the acquisition run.
    pub fn can_recover(&self) -> bool {
        matches!(self, DaqError::SerialPortNotConnected)
    }
}
