//! Deterministic request fingerprints.
//!
//! The fingerprint is the deduplication and cache key: two logically
//! identical requests must always collide to the same value, regardless of
//! how their fields were assembled. Fields are hashed in a fixed order with
//! length prefixes, and set-valued fields are hashed from their sorted form.

use std::fmt;

use crate::request::{GroupedPermissionRequest, PermissionRequest, RequestedAccess};
use crate::types::SecurityLevel;

const REQUEST_CONTEXT: &str = "covenant-request-fingerprint-v0";
const GROUP_CONTEXT: &str = "covenant-grouped-fingerprint-v0";

/// A 32-byte request fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

fn write_component(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Compute the fingerprint of a single request.
///
/// Covers {type, originator, privileged, discriminating fields}. The
/// renewal flag, reason, and spending amount are excluded: a renewal of a
/// grant and a fresh request for it are the same logical slot, and spending
/// slots are keyed per originator alone.
pub fn request_fingerprint(request: &PermissionRequest) -> Fingerprint {
    let mut hasher = blake3::Hasher::new_derive_key(REQUEST_CONTEXT);

    write_component(&mut hasher, request.kind().label().as_bytes());
    write_component(&mut hasher, request.originator().as_bytes());
    write_component(&mut hasher, &[request.privileged() as u8]);

    match request.access() {
        RequestedAccess::Protocol {
            protocol_id,
            counterparty,
        } => {
            write_component(&mut hasher, &[protocol_id.security_level.to_u8()]);
            write_component(&mut hasher, protocol_id.name.as_bytes());
            if protocol_id.security_level == SecurityLevel::Counterparty {
                write_component(&mut hasher, counterparty.to_string().as_bytes());
            }
        }
        RequestedAccess::Basket { basket } => {
            write_component(&mut hasher, basket.as_bytes());
        }
        RequestedAccess::Certificate {
            cert_type,
            fields,
            verifier,
        } => {
            write_component(&mut hasher, cert_type.as_bytes());
            write_component(&mut hasher, verifier.as_bytes());
            // BTreeSet iterates sorted, so assembly order is irrelevant.
            for field in fields {
                write_component(&mut hasher, field.as_bytes());
            }
        }
        RequestedAccess::Spending { .. } => {}
    }

    Fingerprint(*hasher.finalize().as_bytes())
}

/// Compute the fingerprint of a grouped request.
///
/// Hashes the originator, the shared expiry, and each member's fingerprint
/// in order, so identical concurrent groups coalesce to one prompt.
pub fn group_fingerprint(group: &GroupedPermissionRequest) -> Fingerprint {
    let mut hasher = blake3::Hasher::new_derive_key(GROUP_CONTEXT);

    write_component(&mut hasher, group.originator().as_bytes());
    write_component(&mut hasher, &group.expiry().unwrap_or(0).to_le_bytes());
    for member in group.requests() {
        write_component(&mut hasher, request_fingerprint(member).as_bytes());
    }

    Fingerprint(*hasher.finalize().as_bytes())
}
