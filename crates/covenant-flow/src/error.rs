//! Error types for the request-flow module.

use thiserror::Error;

/// Errors that can occur while tracking and resolving requests.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The request id is unknown; nothing was resolved or mutated.
    #[error("request not found: {0}")]
    RequestNotFound(String),

    /// A singular entry point was used on a grouped request, or vice versa.
    #[error("request kind mismatch: {0}")]
    KindMismatch(String),

    /// A waiter's channel closed before a decision arrived.
    #[error("waiter channel closed before resolution")]
    ChannelClosed,
}

/// Result type for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
