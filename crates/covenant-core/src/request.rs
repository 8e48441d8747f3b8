//! Permission requests.
//!
//! A request captures everything a gate needs to decide whether an
//! originator may perform a privileged operation. Requests are immutable
//! once built; the chainable constructors consume and return the value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{Counterparty, PermissionType, ProtocolId, Satoshis, SecurityLevel};

/// What kind of access is being requested, with the discriminating fields
/// for that domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestedAccess {
    /// Use of a protocol keyring.
    Protocol {
        /// The protocol being exercised.
        protocol_id: ProtocolId,
        /// The other party, meaningful only at security level 2.
        counterparty: Counterparty,
    },

    /// Access to a named output basket.
    Basket {
        /// The basket's name.
        basket: String,
    },

    /// Disclosure of certificate fields to a verifier.
    Certificate {
        /// The certificate type identifier.
        cert_type: String,
        /// Field names whose disclosure is requested. Kept sorted so
        /// logically identical requests fingerprint identically.
        fields: BTreeSet<String>,
        /// The verifier the fields would be revealed to.
        verifier: String,
    },

    /// Spending of wallet funds.
    Spending {
        /// Amount the current operation wants to spend.
        satoshis: Satoshis,
        /// Breakdown shown to the human for context.
        line_items: Vec<LineItem>,
    },
}

impl RequestedAccess {
    /// The permission domain this access falls under.
    pub fn kind(&self) -> PermissionType {
        match self {
            RequestedAccess::Protocol { .. } => PermissionType::Protocol,
            RequestedAccess::Basket { .. } => PermissionType::Basket,
            RequestedAccess::Certificate { .. } => PermissionType::Certificate,
            RequestedAccess::Spending { .. } => PermissionType::Spending,
        }
    }
}

/// One row of a spending breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// What the row represents.
    pub kind: LineItemKind,
    /// Human-readable description.
    pub description: String,
    /// Amount for this row.
    pub satoshis: Satoshis,
}

/// Classification of a spending line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineItemKind {
    /// Funds consumed from the wallet.
    Input,
    /// Funds leaving to an output.
    Output,
    /// Network fee.
    Fee,
}

/// A permission request, scoped to one originator and one access domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    originator: String,
    privileged: bool,
    access: RequestedAccess,
    renewal: bool,
    reason: Option<String>,
}

impl PermissionRequest {
    /// Create a new request.
    ///
    /// Protocol counterparties are normalized to `Own` below security
    /// level 2, where the counterparty carries no meaning.
    pub fn new(originator: impl Into<String>, access: RequestedAccess) -> Self {
        let access = match access {
            RequestedAccess::Protocol {
                protocol_id,
                counterparty,
            } => {
                let counterparty = if protocol_id.security_level == SecurityLevel::Counterparty {
                    counterparty
                } else {
                    Counterparty::Own
                };
                RequestedAccess::Protocol {
                    protocol_id,
                    counterparty,
                }
            }
            other => other,
        };

        Self {
            originator: originator.into(),
            privileged: false,
            access,
            renewal: false,
            reason: None,
        }
    }

    /// Mark the request as privileged (or explicitly not).
    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Mark the request as a renewal of an existing token.
    pub fn with_renewal(mut self, renewal: bool) -> Self {
        self.renewal = renewal;
        self
    }

    /// Attach a human-readable reason for display at the UI boundary.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The calling application's domain identity.
    pub fn originator(&self) -> &str {
        &self.originator
    }

    /// Whether the privileged keyring is involved.
    pub fn privileged(&self) -> bool {
        self.privileged
    }

    /// The requested access and its discriminating fields.
    pub fn access(&self) -> &RequestedAccess {
        &self.access
    }

    /// Whether this request renews an existing (expired or exhausted) token.
    pub fn renewal(&self) -> bool {
        self.renewal
    }

    /// Optional display reason.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The permission domain of this request.
    pub fn kind(&self) -> PermissionType {
        self.access.kind()
    }

    /// The amount a spending request wants to spend, if any.
    pub fn spending_amount(&self) -> Option<Satoshis> {
        match &self.access {
            RequestedAccess::Spending { satoshis, .. } => Some(*satoshis),
            _ => None,
        }
    }
}

/// A BRC-73 grouped request: several permissions approved or denied as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedPermissionRequest {
    originator: String,
    expiry: Option<u64>,
    requests: Vec<PermissionRequest>,
}

impl GroupedPermissionRequest {
    /// Start an empty group for one originator.
    pub fn new(originator: impl Into<String>) -> Self {
        Self {
            originator: originator.into(),
            expiry: None,
            requests: Vec::new(),
        }
    }

    /// Set a shared expiry applied to members that carry none of their own.
    pub fn with_expiry(mut self, expiry: u64) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Add a member built from the given access, scoped to the group's
    /// originator.
    pub fn with_access(self, access: RequestedAccess) -> Self {
        let request = PermissionRequest::new(self.originator.clone(), access);
        self.with_request(request)
    }

    /// Add a member request. The member is re-scoped to the group's
    /// originator; its other attributes are preserved.
    pub fn with_request(mut self, request: PermissionRequest) -> Self {
        let member = PermissionRequest {
            originator: self.originator.clone(),
            ..request
        };
        self.requests.push(member);
        self
    }

    /// The group's originator.
    pub fn originator(&self) -> &str {
        &self.originator
    }

    /// The shared expiry, if any.
    pub fn expiry(&self) -> Option<u64> {
        self.expiry
    }

    /// The member requests, in insertion order.
    pub fn requests(&self) -> &[PermissionRequest] {
        &self.requests
    }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of member requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol_access(level: SecurityLevel, counterparty: Counterparty) -> RequestedAccess {
        RequestedAccess::Protocol {
            protocol_id: ProtocolId::new(level, "document signing"),
            counterparty,
        }
    }

    #[test]
    fn test_counterparty_normalized_below_level_two() {
        let request = PermissionRequest::new(
            "example.com",
            protocol_access(SecurityLevel::Protocol, Counterparty::Key("02abc".into())),
        );

        match request.access() {
            RequestedAccess::Protocol { counterparty, .. } => {
                assert_eq!(counterparty, &Counterparty::Own);
            }
            _ => panic!("expected protocol access"),
        }
    }

    #[test]
    fn test_counterparty_preserved_at_level_two() {
        let request = PermissionRequest::new(
            "example.com",
            protocol_access(
                SecurityLevel::Counterparty,
                Counterparty::Key("02abc".into()),
            ),
        );

        match request.access() {
            RequestedAccess::Protocol { counterparty, .. } => {
                assert_eq!(counterparty, &Counterparty::Key("02abc".into()));
            }
            _ => panic!("expected protocol access"),
        }
    }

    #[test]
    fn test_builder_chain() {
        let request = PermissionRequest::new(
            "example.com",
            RequestedAccess::Basket {
                basket: "todo".into(),
            },
        )
        .with_privileged(true)
        .with_renewal(true)
        .with_reason("user asked");

        assert!(request.privileged());
        assert!(request.renewal());
        assert_eq!(request.reason(), Some("user asked"));
        assert_eq!(request.kind(), PermissionType::Basket);
    }

    #[test]
    fn test_group_members_share_originator() {
        let group = GroupedPermissionRequest::new("app.example")
            .with_access(RequestedAccess::Basket {
                basket: "todo".into(),
            })
            .with_request(PermissionRequest::new(
                "other.example",
                RequestedAccess::Basket {
                    basket: "inbox".into(),
                },
            ));

        assert_eq!(group.len(), 2);
        for member in group.requests() {
            assert_eq!(member.originator(), "app.example");
        }
    }
}
