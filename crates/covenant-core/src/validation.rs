//! Structural validation and admin-reserved name checks.
//!
//! Reserved names protect the wallet's own bookkeeping: the admin baskets,
//! the tag/label vocabulary, and any protocol the wallet runs internally.
//! Requests targeting them are rejected before any lookup or prompt.

use crate::error::{CoreError, Result};
use crate::request::{GroupedPermissionRequest, PermissionRequest, RequestedAccess};

/// The wallet's default basket, never exposed to originators.
pub const DEFAULT_BASKET: &str = "default";

const ADMIN_PREFIX: &str = "admin";

/// Maximum originator length.
pub const MAX_ORIGINATOR_LEN: usize = 250;

/// Maximum protocol name length.
pub const MAX_PROTOCOL_NAME_LEN: usize = 400;

/// Maximum basket name length.
pub const MAX_BASKET_NAME_LEN: usize = 300;

/// Whether a protocol name is reserved for wallet-internal use.
pub fn is_admin_protocol_name(name: &str) -> bool {
    name.starts_with(ADMIN_PREFIX)
}

/// Whether a basket name is reserved for wallet-internal use.
pub fn is_admin_basket_name(name: &str) -> bool {
    name == DEFAULT_BASKET || name.starts_with(ADMIN_PREFIX)
}

/// Whether an action label is reserved for wallet-internal use.
pub fn is_admin_label(label: &str) -> bool {
    label.starts_with(ADMIN_PREFIX)
}

/// Reject requests whose target is admin-reserved.
pub fn check_not_admin_reserved(request: &PermissionRequest) -> Result<()> {
    match request.access() {
        RequestedAccess::Protocol { protocol_id, .. } => {
            if is_admin_protocol_name(&protocol_id.name) {
                return Err(CoreError::AdminOnly(format!(
                    "protocol \"{}\"",
                    protocol_id.name
                )));
            }
        }
        RequestedAccess::Basket { basket } => {
            if is_admin_basket_name(basket) {
                return Err(CoreError::AdminOnly(format!("basket \"{basket}\"")));
            }
        }
        RequestedAccess::Certificate { .. } | RequestedAccess::Spending { .. } => {}
    }
    Ok(())
}

/// Validate the structure of a request.
///
/// Malformed requests fail immediately with `InvalidParameter` and are
/// never retried or escalated to a prompt.
pub fn validate_request(request: &PermissionRequest) -> Result<()> {
    validate_originator(request.originator())?;

    match request.access() {
        RequestedAccess::Protocol { protocol_id, .. } => {
            if protocol_id.name.is_empty() {
                return Err(CoreError::InvalidParameter(
                    "protocol name must not be empty".into(),
                ));
            }
            if protocol_id.name.len() > MAX_PROTOCOL_NAME_LEN {
                return Err(CoreError::InvalidParameter(format!(
                    "protocol name exceeds {MAX_PROTOCOL_NAME_LEN} bytes"
                )));
            }
        }
        RequestedAccess::Basket { basket } => {
            if basket.is_empty() {
                return Err(CoreError::InvalidParameter(
                    "basket name must not be empty".into(),
                ));
            }
            if basket.len() > MAX_BASKET_NAME_LEN {
                return Err(CoreError::InvalidParameter(format!(
                    "basket name exceeds {MAX_BASKET_NAME_LEN} bytes"
                )));
            }
        }
        RequestedAccess::Certificate {
            cert_type,
            fields,
            verifier,
        } => {
            if cert_type.is_empty() {
                return Err(CoreError::InvalidParameter(
                    "certificate type must not be empty".into(),
                ));
            }
            if verifier.is_empty() {
                return Err(CoreError::InvalidParameter(
                    "certificate verifier must not be empty".into(),
                ));
            }
            if fields.is_empty() {
                return Err(CoreError::InvalidParameter(
                    "certificate field set must not be empty".into(),
                ));
            }
            if fields.iter().any(|f| f.is_empty()) {
                return Err(CoreError::InvalidParameter(
                    "certificate field names must not be empty".into(),
                ));
            }
        }
        RequestedAccess::Spending { satoshis, .. } => {
            if *satoshis <= 0 {
                return Err(CoreError::InvalidParameter(
                    "spending amount must be positive".into(),
                ));
            }
        }
    }

    Ok(())
}

/// Validate the structure of a grouped request.
pub fn validate_group(group: &GroupedPermissionRequest) -> Result<()> {
    if group.is_empty() {
        return Err(CoreError::InvalidParameter(
            "grouped request must contain at least one permission".into(),
        ));
    }
    for member in group.requests() {
        validate_request(member)?;
        check_not_admin_reserved(member)?;
    }
    Ok(())
}

fn validate_originator(originator: &str) -> Result<()> {
    if originator.is_empty() {
        return Err(CoreError::InvalidParameter(
            "originator must not be empty".into(),
        ));
    }
    if originator.len() > MAX_ORIGINATOR_LEN {
        return Err(CoreError::InvalidParameter(format!(
            "originator exceeds {MAX_ORIGINATOR_LEN} bytes"
        )));
    }
    if originator.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidParameter(
            "originator must not contain whitespace".into(),
        ));
    }
    Ok(())
}
