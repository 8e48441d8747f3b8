//! Search tags and accounting labels.
//!
//! Tags are the on-chain search index for tokens; labels tie actions to an
//! originator and a calendar month for spending accounting. Together with
//! the admin baskets they are the entire persistence format, so the
//! vocabulary here is a compatibility surface.

use covenant_core::{GrantedAccess, Month, PermissionRequest, SecurityLevel};

/// Build the ordered tag set a token of this request is indexed under.
///
/// The same set is attached at mint time and used as the "match all"
/// search filter, so it must only contain values that discriminate the
/// slot: nothing volatile, nothing optional.
pub fn build_tags(request: &PermissionRequest) -> Vec<String> {
    grant_tags(
        request.originator(),
        &GrantedAccess::from_request(request, None),
    )
}

/// Build the tag set for an explicit grant.
pub fn grant_tags(originator: &str, access: &GrantedAccess) -> Vec<String> {
    let mut tags = vec![format!("originator {originator}")];

    match access {
        GrantedAccess::Protocol {
            privileged,
            protocol_id,
            counterparty,
        } => {
            tags.push(format!("privileged {privileged}"));
            tags.push(format!("protocolName {}", protocol_id.name));
            tags.push(format!(
                "protocolSecurityLevel {}",
                protocol_id.security_level
            ));
            if protocol_id.security_level == SecurityLevel::Counterparty {
                tags.push(format!("counterparty {counterparty}"));
            }
        }
        GrantedAccess::Basket { basket } => {
            tags.push(format!("basket {basket}"));
        }
        GrantedAccess::Certificate {
            privileged,
            cert_type,
            verifier,
            ..
        } => {
            tags.push(format!("privileged {privileged}"));
            tags.push(format!("type {cert_type}"));
            tags.push(format!("verifier {verifier}"));
        }
        GrantedAccess::Spending { .. } => {}
    }

    tags
}

/// Label tying an action to its originator.
pub fn originator_label(originator: &str) -> String {
    format!("admin originator {originator}")
}

/// Label tying an action to the month it occurred in.
pub fn month_label(month: &Month) -> String {
    format!("admin month {month}")
}
