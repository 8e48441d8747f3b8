//! Error types for the token module.

use thiserror::Error;

use covenant_wallet::WalletError;

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The locking script is not a recognizable token envelope.
    #[error("malformed token script: {0}")]
    MalformedScript(String),

    /// Field encryption failed.
    #[error("field encryption failed: {0}")]
    Encryption(String),

    /// The set of tokens handed to a lifecycle operation is inconsistent.
    #[error("token set mismatch: {0}")]
    TokenSetMismatch(String),

    /// The action service failed.
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),
}

/// Result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;
