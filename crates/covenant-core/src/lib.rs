//! # Covenant Core
//!
//! Data model for the permission-authorization core: requests, tokens,
//! deterministic fingerprints, and validation.
//!
//! A permission is scoped to one originator (the calling application's
//! domain) and one of four domains: protocol usage, basket access,
//! certificate disclosure, or spending. Grants are persisted as encrypted
//! tokens on the ledger; this crate defines the in-memory shapes those
//! tokens decode into and the rules for matching a token against a request.

pub mod error;
pub mod fingerprint;
pub mod request;
pub mod token;
pub mod types;
pub mod validation;

pub use error::{CoreError, Result};
pub use fingerprint::{group_fingerprint, request_fingerprint, Fingerprint};
pub use request::{
    GroupedPermissionRequest, LineItem, LineItemKind, PermissionRequest, RequestedAccess,
};
pub use token::{GrantedAccess, PermissionToken};
pub use types::{
    now_seconds, Counterparty, Month, Outpoint, PermissionType, ProtocolId, RequestId, Satoshis,
    SecurityLevel, Txid,
};
pub use validation::{
    check_not_admin_reserved, is_admin_basket_name, is_admin_label, is_admin_protocol_name,
    validate_group, validate_request, DEFAULT_BASKET,
};
