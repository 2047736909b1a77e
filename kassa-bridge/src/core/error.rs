use thiserror::Error;

use crate::printing::SettingsStoreError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings store error: {0}")]
    Settings(#[from] SettingsStoreError),

    #[error("Bridge worker stopped")]
    WorkerStopped,
}

/// Result type for bridge setup and serving
pub type Result<T> = std::result::Result<T, BridgeError>;
