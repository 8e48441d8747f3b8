//! Error taxonomy for the permissions manager.

use thiserror::Error;

use covenant_core::{CoreError, Satoshis};
use covenant_flow::FlowError;
use covenant_token::TokenError;

/// Errors surfaced by the permission gates and decision entry points.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The request is malformed. Immediate, never retried.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The target is reserved for wallet-internal use. Immediate; no
    /// request is ever initiated.
    #[error("admin-only: {0}")]
    AdminOnly(String),

    /// A matching token exists but has expired, and the caller disabled
    /// seeking a renewal.
    #[error("permission expired: {0}")]
    Expired(String),

    /// No matching token exists, and the caller disabled seeking one.
    #[error("permission not found: {0}")]
    NotFound(String),

    /// The human explicitly denied the request.
    #[error("permission denied: {0}")]
    Denied(String),

    /// A spend would exceed the authorized monthly ceiling.
    #[error(
        "spending limit exceeded: authorized {authorized}, spent {spent}, requested {requested}"
    )]
    LimitExceeded {
        /// The token's authorized ceiling.
        authorized: Satoshis,
        /// Already spent this month.
        spent: Satoshis,
        /// The increment being requested.
        requested: Satoshis,
    },

    /// Unknown grant/deny id; nothing was resolved.
    #[error("request not found: {0}")]
    RequestNotFound(String),

    /// The pending request was abandoned before a decision arrived.
    #[error("request flow interrupted: {0}")]
    Interrupted(String),

    /// A token create/renew/revoke/coalesce failed on the chain side.
    /// Reported separately from, and without retracting, an already
    /// communicated grant decision.
    #[error("chain operation failed: {0}")]
    ChainOperation(#[from] TokenError),
}

impl From<CoreError> for PermissionError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidParameter(msg) => PermissionError::InvalidParameter(msg),
            CoreError::AdminOnly(target) => PermissionError::AdminOnly(target),
        }
    }
}

impl From<FlowError> for PermissionError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::RequestNotFound(id) => PermissionError::RequestNotFound(id),
            FlowError::KindMismatch(msg) => PermissionError::InvalidParameter(msg),
            FlowError::ChannelClosed => {
                PermissionError::Interrupted("resolution channel closed".into())
            }
        }
    }
}

/// Result type for manager operations.
pub type Result<T> = std::result::Result<T, PermissionError>;
