//! Proptest generators for property-based testing.

use proptest::prelude::*;
use std::collections::BTreeSet;

use covenant_core::{
    Counterparty, LineItem, LineItemKind, PermissionRequest, ProtocolId, RequestedAccess,
    SecurityLevel,
};

/// Generate an originator domain.
pub fn originator() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}\\.(com|org|app)".prop_map(String::from)
}

/// Generate a protocol name.
pub fn protocol_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 ]{4,40}".prop_map(|s| s.trim_end().to_string())
}

/// Generate a basket name.
pub fn basket_name() -> impl Strategy<Value = String> {
    "[b-z][a-z0-9-]{0,40}".prop_map(String::from)
}

/// Generate a security level.
pub fn security_level() -> impl Strategy<Value = SecurityLevel> {
    prop_oneof![
        Just(SecurityLevel::Open),
        Just(SecurityLevel::Protocol),
        Just(SecurityLevel::Counterparty),
    ]
}

/// Generate a counterparty.
pub fn counterparty() -> impl Strategy<Value = Counterparty> {
    prop_oneof![
        Just(Counterparty::Own),
        Just(Counterparty::Anyone),
        "[0-9a-f]{66}".prop_map(Counterparty::Key),
    ]
}

/// Generate a certificate field-name set.
pub fn field_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z][a-z-]{0,15}".prop_map(String::from), 1..6)
}

/// Generate a spending line item.
pub fn line_item() -> impl Strategy<Value = LineItem> {
    (
        prop_oneof![
            Just(LineItemKind::Input),
            Just(LineItemKind::Output),
            Just(LineItemKind::Fee),
        ],
        "[a-z ]{1,30}",
        1i64..100_000,
    )
        .prop_map(|(kind, description, satoshis)| LineItem {
            kind,
            description,
            satoshis,
        })
}

/// Generate a requested access of any kind.
pub fn requested_access() -> impl Strategy<Value = RequestedAccess> {
    prop_oneof![
        (security_level(), protocol_name(), counterparty()).prop_map(
            |(level, name, counterparty)| RequestedAccess::Protocol {
                protocol_id: ProtocolId::new(level, name),
                counterparty,
            }
        ),
        basket_name().prop_map(|basket| RequestedAccess::Basket { basket }),
        ("[a-z]{3,20}", field_names(), "[0-9a-f]{66}").prop_map(
            |(cert_type, fields, verifier)| RequestedAccess::Certificate {
                cert_type,
                fields,
                verifier,
            }
        ),
        (1i64..1_000_000, prop::collection::vec(line_item(), 0..4)).prop_map(
            |(satoshis, line_items)| RequestedAccess::Spending {
                satoshis,
                line_items,
            }
        ),
    ]
}

/// Generate a full permission request.
pub fn permission_request() -> impl Strategy<Value = PermissionRequest> {
    (originator(), requested_access(), any::<bool>(), any::<bool>()).prop_map(
        |(originator, access, privileged, renewal)| {
            PermissionRequest::new(originator, access)
                .with_privileged(privileged)
                .with_renewal(renewal)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::request_fingerprint;

    proptest! {
        #[test]
        fn test_fingerprint_stable_across_clones(request in permission_request()) {
            let clone = request.clone();
            prop_assert_eq!(request_fingerprint(&request), request_fingerprint(&clone));
        }

        #[test]
        fn test_fingerprint_ignores_reason(request in permission_request()) {
            let with_reason = request.clone().with_reason("a display string");
            prop_assert_eq!(
                request_fingerprint(&request),
                request_fingerprint(&with_reason)
            );
        }

        #[test]
        fn test_distinct_originators_distinct_fingerprints(
            access in requested_access(),
            a in originator(),
            b in originator(),
        ) {
            prop_assume!(a != b);
            let ra = PermissionRequest::new(a, access.clone());
            let rb = PermissionRequest::new(b, access);
            prop_assert_ne!(request_fingerprint(&ra), request_fingerprint(&rb));
        }

        #[test]
        fn test_tags_always_lead_with_originator(request in permission_request()) {
            let tags = covenant_token::build_tags(&request);
            prop_assert!(tags[0].starts_with("originator "));
        }
    }
}
