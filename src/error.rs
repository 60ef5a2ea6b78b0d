//! Error types for TxVault

use thiserror::Error;
use std::io;

/// Result type alias for TxVault operations
pub type Result<T> = std::result::Result<T, TxVaultError>;

/// Custom error types for TxVault
#[derive(Error, Debug)]
pub enum TxVaultError {
    /// COMMIT or ROLLBACK issued while no transaction is open.
    #[error("no transaction")]
    NoTransaction,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Protocol parse error: {0}")]
    Protocol(String),
}
