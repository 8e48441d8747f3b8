//! Error types for the wallet seams.

use thiserror::Error;

/// Errors surfaced by the action service or the encryption service.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The action service refused the operation.
    #[error("action rejected: {0}")]
    Rejected(String),

    /// A referenced entity (output, draft, action) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The arguments were malformed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(String),
}

/// Result type for wallet operations.
pub type Result<T> = std::result::Result<T, WalletError>;
