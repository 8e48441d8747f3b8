//! Error types for the permission core.

use thiserror::Error;

/// Core errors raised during request construction and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request is malformed. Never retried.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The target is reserved for wallet-internal use.
    #[error("admin-only: {0} is reserved for the wallet")]
    AdminOnly(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
