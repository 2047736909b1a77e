//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error (refused, unreachable)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error while writing to the printer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout elapsed before the job was written
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The delivery task ended without reporting an outcome
    #[error("Delivery aborted: {0}")]
    Aborted(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
