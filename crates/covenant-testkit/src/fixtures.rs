//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a manager wired to an
//! in-memory wallet, plus constructors for the request shapes that come up
//! constantly.

use std::collections::BTreeSet;
use std::sync::Arc;

use covenant::{PermissionsConfig, PermissionsManager};
use covenant_core::{
    Counterparty, PermissionRequest, ProtocolId, RequestedAccess, SecurityLevel,
};
use covenant_token::{TokenFinder, TokenLifecycle};
use covenant_wallet::MemoryWallet;

/// The admin originator every fixture manager trusts.
pub const ADMIN_ORIGINATOR: &str = "admin.wallet";

/// A test fixture bundling a memory wallet with the components built on it.
pub struct TestFixture {
    /// The in-memory wallet behind every seam.
    pub wallet: Arc<MemoryWallet>,
    /// A manager with default configuration.
    pub manager: Arc<PermissionsManager>,
    /// A finder sharing the wallet, for direct ledger assertions.
    pub finder: TokenFinder,
    /// A lifecycle manager sharing the wallet, for seeding tokens.
    pub lifecycle: TokenLifecycle,
}

impl TestFixture {
    /// Create a fixture with a random wallet seed and default config.
    pub fn new() -> Self {
        Self::with_config(PermissionsConfig::default())
    }

    /// Create with an explicit configuration.
    pub fn with_config(config: PermissionsConfig) -> Self {
        Self::build(MemoryWallet::new(), config)
    }

    /// Create with a deterministic wallet seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::build(MemoryWallet::with_seed(seed), PermissionsConfig::default())
    }

    fn build(wallet: MemoryWallet, config: PermissionsConfig) -> Self {
        let wallet = Arc::new(wallet);
        let manager = Arc::new(PermissionsManager::new(
            wallet.clone(),
            wallet.clone(),
            ADMIN_ORIGINATOR,
            config,
        ));
        let finder = TokenFinder::new(wallet.clone(), wallet.clone());
        let lifecycle = TokenLifecycle::new(wallet.clone(), wallet.clone());
        Self {
            wallet,
            manager,
            finder,
            lifecycle,
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A level-1 protocol request for the given originator.
pub fn protocol_request(originator: &str, protocol: &str) -> PermissionRequest {
    PermissionRequest::new(
        originator,
        RequestedAccess::Protocol {
            protocol_id: ProtocolId::new(SecurityLevel::Protocol, protocol),
            counterparty: Counterparty::Own,
        },
    )
}

/// A basket request for the given originator.
pub fn basket_request(originator: &str, basket: &str) -> PermissionRequest {
    PermissionRequest::new(
        originator,
        RequestedAccess::Basket {
            basket: basket.into(),
        },
    )
}

/// A certificate request covering the given field names.
pub fn certificate_request(originator: &str, fields: &[&str]) -> PermissionRequest {
    PermissionRequest::new(
        originator,
        RequestedAccess::Certificate {
            cert_type: "identity".into(),
            fields: fields.iter().map(|f| f.to_string()).collect::<BTreeSet<_>>(),
            verifier: "02beef".into(),
        },
    )
}

/// A spending request for the given amount.
pub fn spending_request(originator: &str, satoshis: i64) -> PermissionRequest {
    PermissionRequest::new(
        originator,
        RequestedAccess::Spending {
            satoshis,
            line_items: vec![],
        },
    )
}
