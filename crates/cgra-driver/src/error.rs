//! Error types for CGRA driver operations

use thiserror::Error;

/// Result type alias for CGRA driver operations
pub type Result<T> = std::result::Result<T, CgraError>;

/// Errors reported by a bus backend or by configuration validation.
///
/// Caller contract violations (malformed lengths, missing dirty flags,
/// conflicting run parameters) are not errors: they panic.
#[derive(Debug, Error)]
pub enum CgraError {
    /// I/O error while opening or sizing a device window
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// A bus transaction could not be issued
    #[error("Transfer failed: {reason}")]
    TransferFailed {
        /// Reason for failure
        reason: String,
    },

    /// A transaction reaches past the mapped window
    #[error("Transaction at {address:#x} ({words} words) exceeds window of {limit:#x} bytes")]
    OutOfBounds {
        /// Start byte address of the transaction
        address: u32,
        /// Number of 32-bit words in the transaction
        words: usize,
        /// Size of the mapped window in bytes
        limit: usize,
    },

    /// Mapping the device window failed
    #[error("Failed to map {path}: {reason}")]
    MapFailed {
        /// Device or file path
        path: String,
        /// Reason for failure
        reason: String,
    },

    /// Setup data is inconsistent
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong
        reason: String,
    },
}

impl CgraError {
    /// Create a transfer failed error
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            reason: reason.into(),
        }
    }

    /// Create a map failed error
    pub fn map_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MapFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
