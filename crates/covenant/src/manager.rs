//! The permissions manager: unified API over gates, grants, and tokens.
//!
//! Every privileged operation an originator attempts funnels through one
//! of the four gates. A gate either allows immediately (admin caller, open
//! protocol, bypassed usage, fresh cache entry, live token) or suspends
//! the caller on a pending request until the UI boundary calls `grant` or
//! `deny`. All shared registries are owned by the manager instance, so
//! concurrently running managers never interfere.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use covenant_core::{
    check_not_admin_reserved, group_fingerprint, now_seconds, request_fingerprint, validate_group,
    validate_request, Counterparty, Fingerprint, GroupedPermissionRequest, LineItem, Month,
    PermissionRequest, PermissionToken, PermissionType, ProtocolId, RequestId, RequestedAccess,
    Satoshis, SecurityLevel,
};
use covenant_flow::{
    ActiveRequestTracker, Decision, EventBus, GroupedRequestEvent, Pending, PermissionCache,
    PermissionEvents, Registration, RequestEvent,
};
use covenant_token::{TokenFinder, TokenLifecycle};
use covenant_wallet::{WalletActions, WalletCipher};

use crate::config::{BasketUsage, CertificateUsage, PermissionsConfig, ProtocolUsage};
use crate::error::{PermissionError, Result};

/// Default lifetime of a newly granted token: 30 days.
pub const DEFAULT_TOKEN_LIFETIME: u64 = 30 * 24 * 60 * 60;

/// Options accompanying a grant decision.
#[derive(Debug, Clone, Default)]
pub struct GrantOptions {
    /// Allow this once without minting a token.
    pub ephemeral: bool,
    /// Expiry for the minted or renewed token; defaults to now + 30 days.
    pub expiry: Option<u64>,
    /// Authorized amount override for spending grants.
    pub amount: Option<Satoshis>,
}

impl GrantOptions {
    /// A one-time grant that leaves no token behind.
    pub fn ephemeral() -> Self {
        Self {
            ephemeral: true,
            ..Default::default()
        }
    }
}

/// Arguments to the protocol gate.
#[derive(Debug, Clone)]
pub struct ProtocolAccess {
    /// The calling application's domain.
    pub originator: String,
    /// Whether the privileged keyring is involved.
    pub privileged: bool,
    /// The protocol being exercised.
    pub protocol_id: ProtocolId,
    /// The other party, meaningful only at security level 2.
    pub counterparty: Counterparty,
    /// What the permission is being exercised for.
    pub usage: ProtocolUsage,
    /// Display reason for the UI boundary.
    pub reason: Option<String>,
    /// Whether a missing or expired grant may trigger a request.
    pub seek_permission: bool,
}

/// Arguments to the basket gate.
#[derive(Debug, Clone)]
pub struct BasketAccess {
    /// The calling application's domain.
    pub originator: String,
    /// The basket being touched.
    pub basket: String,
    /// What the access is being exercised for.
    pub usage: BasketUsage,
    /// Display reason for the UI boundary.
    pub reason: Option<String>,
    /// Whether a missing or expired grant may trigger a request.
    pub seek_permission: bool,
}

/// Arguments to the certificate gate.
#[derive(Debug, Clone)]
pub struct CertificateAccess {
    /// The calling application's domain.
    pub originator: String,
    /// Whether the privileged keyring is involved.
    pub privileged: bool,
    /// The certificate type.
    pub cert_type: String,
    /// Field names whose disclosure is requested.
    pub fields: BTreeSet<String>,
    /// The verifier the fields would be revealed to.
    pub verifier: String,
    /// What the access is being exercised for.
    pub usage: CertificateUsage,
    /// Display reason for the UI boundary.
    pub reason: Option<String>,
    /// Whether a missing or expired grant may trigger a request.
    pub seek_permission: bool,
}

/// Arguments to the spending gate.
#[derive(Debug, Clone)]
pub struct SpendingAccess {
    /// The calling application's domain.
    pub originator: String,
    /// Amount the operation wants to spend.
    pub satoshis: Satoshis,
    /// Breakdown shown to the human.
    pub line_items: Vec<LineItem>,
    /// Display reason for the UI boundary.
    pub reason: Option<String>,
    /// Whether a missing authorization may trigger a request.
    pub seek_permission: bool,
}

/// The permissions manager.
pub struct PermissionsManager {
    admin_originator: String,
    config: PermissionsConfig,
    cache: PermissionCache,
    tracker: ActiveRequestTracker,
    events: EventBus,
    finder: TokenFinder,
    lifecycle: TokenLifecycle,
}

impl PermissionsManager {
    /// Create a manager over the wallet seams.
    pub fn new(
        wallet: Arc<dyn WalletActions>,
        cipher: Arc<dyn WalletCipher>,
        admin_originator: impl Into<String>,
        config: PermissionsConfig,
    ) -> Self {
        Self {
            admin_originator: admin_originator.into(),
            config,
            cache: PermissionCache::with_default_ttl(),
            tracker: ActiveRequestTracker::new(),
            events: EventBus::new(),
            finder: TokenFinder::new(Arc::clone(&wallet), Arc::clone(&cipher)),
            lifecycle: TokenLifecycle::new(wallet, cipher),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &PermissionsConfig {
        &self.config
    }

    /// Register a listener for permission events; returns an unbind handle.
    pub async fn bind_listener(&self, listener: Arc<dyn PermissionEvents>) -> usize {
        self.events.bind(listener).await
    }

    /// Remove a previously bound listener.
    pub async fn unbind_listener(&self, handle: usize) -> bool {
        self.events.unbind(handle).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Gates
    // ─────────────────────────────────────────────────────────────────────────

    /// Ensure an originator may use a protocol keyring.
    pub async fn ensure_protocol_permission(&self, access: ProtocolAccess) -> Result<()> {
        if self.is_admin(&access.originator) {
            return Ok(());
        }
        // Security level 0 protocols are open by definition.
        if access.protocol_id.security_level == SecurityLevel::Open {
            return Ok(());
        }
        if !self.config.seeks_protocol(access.usage) {
            return Ok(());
        }

        let mut request = PermissionRequest::new(
            access.originator,
            RequestedAccess::Protocol {
                protocol_id: access.protocol_id,
                counterparty: access.counterparty,
            },
        )
        .with_privileged(access.privileged);
        if let Some(reason) = access.reason {
            request = request.with_reason(reason);
        }

        self.ensure(request, access.seek_permission).await
    }

    /// Ensure an originator may touch a basket.
    pub async fn ensure_basket_access(&self, access: BasketAccess) -> Result<()> {
        if self.is_admin(&access.originator) {
            return Ok(());
        }
        if !self.config.seeks_basket(access.usage) {
            return Ok(());
        }

        let mut request = PermissionRequest::new(
            access.originator,
            RequestedAccess::Basket {
                basket: access.basket,
            },
        );
        if let Some(reason) = access.reason {
            request = request.with_reason(reason);
        }

        self.ensure(request, access.seek_permission).await
    }

    /// Ensure an originator may disclose certificate fields to a verifier.
    pub async fn ensure_certificate_access(&self, access: CertificateAccess) -> Result<()> {
        if self.is_admin(&access.originator) {
            return Ok(());
        }
        if !self.config.seeks_certificate(access.usage) {
            return Ok(());
        }

        let mut request = PermissionRequest::new(
            access.originator,
            RequestedAccess::Certificate {
                cert_type: access.cert_type,
                fields: access.fields,
                verifier: access.verifier,
            },
        )
        .with_privileged(access.privileged);
        if let Some(reason) = access.reason {
            request = request.with_reason(reason);
        }

        self.ensure(request, access.seek_permission).await
    }

    /// Ensure an originator may spend the given amount this month.
    pub async fn ensure_spending_authorization(&self, access: SpendingAccess) -> Result<()> {
        if self.is_admin(&access.originator) {
            return Ok(());
        }
        if !self.config.seek_spending_permissions {
            return Ok(());
        }

        let mut request = PermissionRequest::new(
            access.originator,
            RequestedAccess::Spending {
                satoshis: access.satoshis,
                line_items: access.line_items,
            },
        );
        if let Some(reason) = access.reason {
            request = request.with_reason(reason);
        }

        self.ensure(request, access.seek_permission).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decision Entry Points
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant a pending request.
    ///
    /// Every waiter is resolved first; unless the grant is ephemeral, the
    /// token is then minted (or renewed) with the already-known
    /// parameters. A chain failure surfaces here without retracting the
    /// decision the waiters have already received.
    pub async fn grant(&self, request_id: &RequestId, options: GrantOptions) -> Result<()> {
        let now = now_seconds();
        let expiry = options.expiry.unwrap_or(now + DEFAULT_TOKEN_LIFETIME);

        let (request, previous) = self
            .tracker
            .resolve_single(request_id, Decision::Granted { expiry })
            .await?;

        if options.ephemeral {
            debug!(request_id = %request_id, "ephemeral grant, no token minted");
            return Ok(());
        }

        match previous {
            Some(old) => {
                self.lifecycle
                    .renew(&old, &request, expiry, options.amount)
                    .await?;
            }
            None => {
                self.lifecycle
                    .create(&request, expiry, options.amount)
                    .await?;
            }
        }
        Ok(())
    }

    /// Deny a pending request, resolving every waiter with a denial.
    pub async fn deny(&self, request_id: &RequestId) -> Result<()> {
        self.tracker
            .resolve_single(request_id, Decision::Denied)
            .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grouped Permissions (BRC-73)
    // ─────────────────────────────────────────────────────────────────────────

    /// Request a batch of permissions approved or denied as one.
    ///
    /// Identical concurrent groups coalesce into one prompt. The decision
    /// applies to the whole group atomically.
    pub async fn ensure_grouped_permission(
        &self,
        group: GroupedPermissionRequest,
    ) -> Result<()> {
        if self.is_admin(group.originator()) {
            return Ok(());
        }
        if !self.config.seek_grouped_permission {
            return Err(PermissionError::InvalidParameter(
                "grouped permissions are disabled by configuration".into(),
            ));
        }
        validate_group(&group)?;

        let fingerprint = group_fingerprint(&group);
        let registration = self
            .tracker
            .register(
                fingerprint,
                Pending::Grouped {
                    group: group.clone(),
                },
            )
            .await;

        let rx = match registration {
            Registration::New { request_id, rx } => {
                self.events
                    .dispatch_grouped(GroupedRequestEvent { group, request_id })
                    .await;
                rx
            }
            Registration::Joined { rx } => rx,
        };

        match rx.await {
            Ok(Decision::Granted { .. }) => Ok(()),
            Ok(Decision::Denied) => Err(PermissionError::Denied("grouped permission".into())),
            Err(_) => Err(PermissionError::Interrupted(
                "grouped request abandoned before resolution".into(),
            )),
        }
    }

    /// Grant a pending grouped request, minting one token per member.
    ///
    /// Members without their own expiry use the group's shared expiry, or
    /// the 30-day default. The first chain failure propagates; the
    /// decision itself has already been resolved to every waiter.
    pub async fn grant_grouped(&self, request_id: &RequestId) -> Result<()> {
        let group = self
            .tracker
            .resolve_grouped(request_id, Decision::Granted { expiry: 0 })
            .await?;

        let now = now_seconds();
        let expiry = group.expiry().unwrap_or(now + DEFAULT_TOKEN_LIFETIME);
        for member in group.requests() {
            self.lifecycle
                .create(member, expiry, member.spending_amount())
                .await?;
        }
        Ok(())
    }

    /// Deny a pending grouped request.
    pub async fn deny_grouped(&self, request_id: &RequestId) -> Result<()> {
        self.tracker
            .resolve_grouped(request_id, Decision::Denied)
            .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gate Pipeline
    // ─────────────────────────────────────────────────────────────────────────

    async fn ensure(&self, request: PermissionRequest, seek_permission: bool) -> Result<()> {
        validate_request(&request)?;
        check_not_admin_reserved(&request)?;

        // With differentiation off, privileged and plain requests share
        // one slot.
        let request = if self.config.differentiate_privileged_operations {
            request
        } else {
            request.with_privileged(false)
        };

        let kind = request.kind();
        let now = now_seconds();
        let fingerprint = request_fingerprint(&request);

        if kind.uses_cache() && self.cache.is_fresh(&fingerprint, now).await {
            return Ok(());
        }

        match self.finder.find_token(&request, true, now).await? {
            Some(token) if !token.is_expired(now) => {
                if kind == PermissionType::Spending {
                    return self
                        .check_spending_limit(request, token, now, seek_permission)
                        .await;
                }
                self.cache.insert(fingerprint, token.expiry).await;
                Ok(())
            }
            Some(expired) => {
                if !seek_permission {
                    return Err(PermissionError::Expired(slot_description(&request)));
                }
                let request = request.with_renewal(true);
                self.request_flow(request, Some(expired), fingerprint).await
            }
            None => {
                if !seek_permission {
                    return Err(PermissionError::NotFound(slot_description(&request)));
                }
                self.request_flow(request, None, fingerprint).await
            }
        }
    }

    async fn check_spending_limit(
        &self,
        request: PermissionRequest,
        token: PermissionToken,
        now: u64,
        seek_permission: bool,
    ) -> Result<()> {
        let authorized = token.authorized_amount().unwrap_or(0);
        let requested = request.spending_amount().unwrap_or(0);
        let spent = self
            .finder
            .spent_since(request.originator(), &Month::from_unix(now))
            .await?;

        if spent + requested <= authorized {
            return Ok(());
        }

        if !seek_permission || !self.config.allow_spending_limit_increase {
            return Err(PermissionError::LimitExceeded {
                authorized,
                spent,
                requested,
            });
        }

        // Escalate: ask for a fresh, higher authorization replacing the
        // current token.
        debug!(
            originator = request.originator(),
            authorized, spent, requested, "spending overage, requesting higher authorization"
        );
        let request = request.with_renewal(true);
        let fingerprint = request_fingerprint(&request);
        self.request_flow(request, Some(token), fingerprint).await
    }

    async fn request_flow(
        &self,
        request: PermissionRequest,
        previous: Option<PermissionToken>,
        fingerprint: Fingerprint,
    ) -> Result<()> {
        let kind = request.kind();
        let registration = self
            .tracker
            .register(
                fingerprint,
                Pending::Single {
                    request: request.clone(),
                    previous,
                },
            )
            .await;

        let rx = match registration {
            Registration::New { request_id, rx } => {
                self.events
                    .dispatch_request(
                        kind,
                        RequestEvent {
                            request: request.clone(),
                            request_id,
                        },
                    )
                    .await;
                rx
            }
            Registration::Joined { rx } => rx,
        };

        match rx.await {
            Ok(Decision::Granted { expiry }) => {
                if kind.uses_cache() {
                    self.cache.insert(fingerprint, expiry).await;
                }
                Ok(())
            }
            Ok(Decision::Denied) => Err(PermissionError::Denied(slot_description(&request))),
            Err(_) => Err(PermissionError::Interrupted(
                "request abandoned before resolution".into(),
            )),
        }
    }

    fn is_admin(&self, originator: &str) -> bool {
        originator == self.admin_originator
    }
}

fn slot_description(request: &PermissionRequest) -> String {
    format!(
        "{} permission for {}",
        request.kind().label(),
        request.originator()
    )
}
