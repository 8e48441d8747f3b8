//! # Covenant
//!
//! The permission-authorization core of a wallet. Every privileged
//! operation an external originator attempts (spending, protocol-key
//! usage, basket access, certificate disclosure) is mediated here, and
//! every grant is persisted as an encrypted, UTXO-backed token on the
//! ledger. Grants survive restarts, are independently auditable by any
//! compatible implementation, and are revoked by spending their output.
//!
//! ## Flow
//!
//! A gate receives a request and allows immediately for the admin
//! originator, open protocols, and bypassed usages. Otherwise it consults
//! the TTL cache, then the ledger. A live token allows; an expired token
//! triggers a renewal request; an absent token triggers a fresh request.
//! Pending requests deduplicate across concurrent callers, dispatch one
//! event to the UI boundary, and resolve when `grant` or `deny` is
//! called.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use covenant::{PermissionsConfig, PermissionsManager};
//! use covenant_wallet::MemoryWallet;
//!
//! let wallet = Arc::new(MemoryWallet::new());
//! let manager = PermissionsManager::new(
//!     wallet.clone(),
//!     wallet,
//!     "admin.wallet",
//!     PermissionsConfig::default(),
//! );
//! // manager.bind_listener(...), then gates and grant/deny.
//! ```

pub mod config;
pub mod error;
pub mod manager;

pub use config::{BasketUsage, CertificateUsage, PermissionsConfig, ProtocolUsage};
pub use error::{PermissionError, Result};
pub use manager::{
    BasketAccess, CertificateAccess, GrantOptions, PermissionsManager, ProtocolAccess,
    SpendingAccess, DEFAULT_TOKEN_LIFETIME,
};

pub use covenant_core::{
    Counterparty, Fingerprint, GroupedPermissionRequest, LineItem, LineItemKind,
    PermissionRequest, PermissionToken, PermissionType, ProtocolId, RequestId, RequestedAccess,
    Satoshis, SecurityLevel,
};
pub use covenant_flow::{GroupedRequestEvent, PermissionEvents, RequestEvent};
