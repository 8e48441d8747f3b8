//! Permission tokens.
//!
//! A token is the on-chain artifact of a grant: a spendable output whose
//! locking script embeds the encrypted authorization fields. Tokens are
//! minted on grant, replaced on renewal, consolidated by coalescing, and
//! destroyed by revocation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::request::{PermissionRequest, RequestedAccess};
use crate::types::{Counterparty, Outpoint, PermissionType, ProtocolId, Satoshis, SecurityLevel};

/// The access a token grants, with the decrypted discriminating fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantedAccess {
    /// Protocol keyring usage.
    Protocol {
        /// Whether the privileged keyring is covered.
        privileged: bool,
        /// The granted protocol.
        protocol_id: ProtocolId,
        /// Counterparty scope, meaningful only at security level 2.
        counterparty: Counterparty,
    },

    /// Basket access.
    Basket {
        /// The granted basket.
        basket: String,
    },

    /// Certificate field disclosure.
    Certificate {
        /// Whether the privileged keyring is covered.
        privileged: bool,
        /// The certificate type.
        cert_type: String,
        /// The full set of field names the grant covers.
        fields: BTreeSet<String>,
        /// The verifier fields may be revealed to.
        verifier: String,
    },

    /// Spending authorization.
    Spending {
        /// Monthly ceiling the originator may spend.
        authorized_amount: Satoshis,
    },
}

impl GrantedAccess {
    /// The access a grant of the given request would confer.
    ///
    /// For spending requests, `amount` overrides the requested satoshis as
    /// the authorized ceiling (the granter may approve a higher figure).
    pub fn from_request(request: &PermissionRequest, amount: Option<Satoshis>) -> Self {
        match request.access() {
            RequestedAccess::Protocol {
                protocol_id,
                counterparty,
            } => GrantedAccess::Protocol {
                privileged: request.privileged(),
                protocol_id: protocol_id.clone(),
                counterparty: counterparty.clone(),
            },
            RequestedAccess::Basket { basket } => GrantedAccess::Basket {
                basket: basket.clone(),
            },
            RequestedAccess::Certificate {
                cert_type,
                fields,
                verifier,
            } => GrantedAccess::Certificate {
                privileged: request.privileged(),
                cert_type: cert_type.clone(),
                fields: fields.clone(),
                verifier: verifier.clone(),
            },
            RequestedAccess::Spending { satoshis, .. } => GrantedAccess::Spending {
                authorized_amount: amount.unwrap_or(*satoshis),
            },
        }
    }

    /// The permission domain this grant falls under.
    pub fn kind(&self) -> PermissionType {
        match self {
            GrantedAccess::Protocol { .. } => PermissionType::Protocol,
            GrantedAccess::Basket { .. } => PermissionType::Basket,
            GrantedAccess::Certificate { .. } => PermissionType::Certificate,
            GrantedAccess::Spending { .. } => PermissionType::Spending,
        }
    }
}

/// An on-chain permission token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionToken {
    /// The backing transaction bundle, opaque to this core.
    pub tx: Bytes,
    /// Where the token output lives.
    pub outpoint: Outpoint,
    /// Satoshis carried by the token output.
    pub satoshis: Satoshis,
    /// The originator the grant is scoped to.
    pub originator: String,
    /// Unix-seconds expiry; 0 means never.
    pub expiry: u64,
    /// What the token authorizes.
    pub access: GrantedAccess,
}

impl PermissionToken {
    /// The permission domain of this token.
    pub fn kind(&self) -> PermissionType {
        self.access.kind()
    }

    /// Whether the token has expired as of `now` (unix seconds).
    ///
    /// Tokens with expiry 0 never expire.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry != 0 && self.expiry <= now
    }

    /// The authorized spending ceiling, for spending tokens.
    pub fn authorized_amount(&self) -> Option<Satoshis> {
        match &self.access {
            GrantedAccess::Spending { authorized_amount } => Some(*authorized_amount),
            _ => None,
        }
    }

    /// Whether this token satisfies the given request.
    ///
    /// Every discriminating value is compared by strict equality; the one
    /// exception is certificate fields, where the requested set must be a
    /// subset of the granted set. Expiry is not considered here.
    pub fn satisfies(&self, request: &PermissionRequest) -> bool {
        if self.originator != request.originator() {
            return false;
        }

        match (&self.access, request.access()) {
            (
                GrantedAccess::Protocol {
                    privileged,
                    protocol_id,
                    counterparty,
                },
                RequestedAccess::Protocol {
                    protocol_id: wanted,
                    counterparty: wanted_counterparty,
                },
            ) => {
                *privileged == request.privileged()
                    && protocol_id == wanted
                    && (wanted.security_level != SecurityLevel::Counterparty
                        || counterparty == wanted_counterparty)
            }

            (
                GrantedAccess::Basket { basket },
                RequestedAccess::Basket { basket: wanted },
            ) => basket == wanted,

            (
                GrantedAccess::Certificate {
                    privileged,
                    cert_type,
                    fields,
                    verifier,
                },
                RequestedAccess::Certificate {
                    cert_type: wanted_type,
                    fields: wanted_fields,
                    verifier: wanted_verifier,
                },
            ) => {
                *privileged == request.privileged()
                    && cert_type == wanted_type
                    && verifier == wanted_verifier
                    && wanted_fields.is_subset(fields)
            }

            (GrantedAccess::Spending { .. }, RequestedAccess::Spending { .. }) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Txid;

    fn token(access: GrantedAccess) -> PermissionToken {
        PermissionToken {
            tx: Bytes::new(),
            outpoint: Outpoint::new(Txid::ZERO, 0),
            satoshis: 1,
            originator: "example.com".into(),
            expiry: 0,
            access,
        }
    }

    fn fields(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expiry_zero_never_expires() {
        let token = token(GrantedAccess::Basket {
            basket: "todo".into(),
        });
        assert!(!token.is_expired(u64::MAX));
    }

    #[test]
    fn test_expiry_boundary() {
        let mut token = token(GrantedAccess::Basket {
            basket: "todo".into(),
        });
        token.expiry = 1000;

        assert!(!token.is_expired(999));
        assert!(token.is_expired(1000));
        assert!(token.is_expired(1001));
    }

    #[test]
    fn test_certificate_subset_rule() {
        let token = token(GrantedAccess::Certificate {
            privileged: false,
            cert_type: "identity".into(),
            fields: fields(&["name", "email"]),
            verifier: "02beef".into(),
        });

        let name_only = PermissionRequest::new(
            "example.com",
            RequestedAccess::Certificate {
                cert_type: "identity".into(),
                fields: fields(&["name"]),
                verifier: "02beef".into(),
            },
        );
        assert!(token.satisfies(&name_only));

        let ssn = PermissionRequest::new(
            "example.com",
            RequestedAccess::Certificate {
                cert_type: "identity".into(),
                fields: fields(&["ssn"]),
                verifier: "02beef".into(),
            },
        );
        assert!(!token.satisfies(&ssn));
    }

    #[test]
    fn test_originator_mismatch_never_satisfies() {
        let token = token(GrantedAccess::Spending {
            authorized_amount: 1000,
        });

        let request = PermissionRequest::new(
            "other.com",
            RequestedAccess::Spending {
                satoshis: 10,
                line_items: vec![],
            },
        );
        assert!(!token.satisfies(&request));
    }

    #[test]
    fn test_counterparty_ignored_below_level_two() {
        let token = token(GrantedAccess::Protocol {
            privileged: false,
            protocol_id: ProtocolId::new(SecurityLevel::Protocol, "document signing"),
            counterparty: Counterparty::Own,
        });

        // The request's counterparty is normalized away below level 2, so
        // the grant matches regardless of what the caller passed.
        let request = PermissionRequest::new(
            "example.com",
            RequestedAccess::Protocol {
                protocol_id: ProtocolId::new(SecurityLevel::Protocol, "document signing"),
                counterparty: Counterparty::Key("02abc".into()),
            },
        );
        assert!(token.satisfies(&request));
    }

    #[test]
    fn test_counterparty_checked_at_level_two() {
        let token = token(GrantedAccess::Protocol {
            privileged: false,
            protocol_id: ProtocolId::new(SecurityLevel::Counterparty, "messaging"),
            counterparty: Counterparty::Key("02abc".into()),
        });

        let matching = PermissionRequest::new(
            "example.com",
            RequestedAccess::Protocol {
                protocol_id: ProtocolId::new(SecurityLevel::Counterparty, "messaging"),
                counterparty: Counterparty::Key("02abc".into()),
            },
        );
        assert!(token.satisfies(&matching));

        let wrong = PermissionRequest::new(
            "example.com",
            RequestedAccess::Protocol {
                protocol_id: ProtocolId::new(SecurityLevel::Counterparty, "messaging"),
                counterparty: Counterparty::Key("02def".into()),
            },
        );
        assert!(!token.satisfies(&wrong));
    }

    #[test]
    fn test_privileged_mismatch_rejected() {
        let token = token(GrantedAccess::Protocol {
            privileged: true,
            protocol_id: ProtocolId::new(SecurityLevel::Protocol, "document signing"),
            counterparty: Counterparty::Own,
        });

        let unprivileged = PermissionRequest::new(
            "example.com",
            RequestedAccess::Protocol {
                protocol_id: ProtocolId::new(SecurityLevel::Protocol, "document signing"),
                counterparty: Counterparty::Own,
            },
        );
        assert!(!token.satisfies(&unprivileged));
    }
}
