//! Strong type definitions for the permission core.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Satoshi amounts. Signed: action listings report net deltas.
pub type Satoshis = i64;

/// The four permission domains a gate can mediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionType {
    /// Use of a protocol keyring (signing, encrypting, HMAC, ...).
    Protocol,
    /// Access to a named output basket.
    Basket,
    /// Disclosure of certificate fields to a verifier.
    Certificate,
    /// Spending of wallet funds up to an authorized amount.
    Spending,
}

impl PermissionType {
    /// The reserved admin basket holding this kind's tokens.
    ///
    /// One basket per kind; together with the search tags these baskets are
    /// the entire persistence format.
    pub fn admin_basket(self) -> &'static str {
        match self {
            PermissionType::Protocol => "admin protocol-permission",
            PermissionType::Basket => "admin basket-access",
            PermissionType::Certificate => "admin certificate-access",
            PermissionType::Spending => "admin spending-authorization",
        }
    }

    /// Number of encrypted fields a token of this kind carries.
    ///
    /// Candidates with fewer fields are rejected during decode.
    pub fn field_count(self) -> usize {
        match self {
            PermissionType::Protocol => 6,
            PermissionType::Basket => 3,
            PermissionType::Certificate => 6,
            PermissionType::Spending => 2,
        }
    }

    /// Whether gate evaluations of this kind may be served from the TTL cache.
    ///
    /// Spending is excluded: limit accounting must observe every call.
    pub fn uses_cache(self) -> bool {
        !matches!(self, PermissionType::Spending)
    }

    /// Whether tokens of this kind carry an expiry.
    ///
    /// Spending authorizations persist until revoked or renewed; their
    /// ceiling is the authorized amount, not a deadline.
    pub fn expires(self) -> bool {
        !matches!(self, PermissionType::Spending)
    }

    /// Lowercase label used in descriptions and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            PermissionType::Protocol => "protocol",
            PermissionType::Basket => "basket",
            PermissionType::Certificate => "certificate",
            PermissionType::Spending => "spending",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Default openness classification of a protocol (0-2).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum SecurityLevel {
    /// No permission required.
    Open = 0,
    /// One grant covers the protocol for the originator.
    Protocol = 1,
    /// Grants are scoped per counterparty.
    Counterparty = 2,
}

impl SecurityLevel {
    /// Convert to u8 for encoding.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Open),
            1 => Some(Self::Protocol),
            2 => Some(Self::Counterparty),
            _ => None,
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u8())
    }
}

/// A protocol identity: security level plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolId {
    /// Openness classification.
    pub security_level: SecurityLevel,
    /// The protocol's name.
    pub name: String,
}

impl ProtocolId {
    /// Create a new protocol identity.
    pub fn new(security_level: SecurityLevel, name: impl Into<String>) -> Self {
        Self {
            security_level,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.security_level, self.name)
    }
}

/// The other party a protocol interaction is keyed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Counterparty {
    /// The wallet itself.
    Own,
    /// Anyone; no specific identity.
    Anyone,
    /// A specific identity key.
    Key(String),
}

impl Counterparty {
    /// Parse from the wire/tag representation.
    pub fn parse(s: &str) -> Self {
        match s {
            "self" => Counterparty::Own,
            "anyone" => Counterparty::Anyone,
            other => Counterparty::Key(other.to_string()),
        }
    }
}

impl fmt::Display for Counterparty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counterparty::Own => f.write_str("self"),
            Counterparty::Anyone => f.write_str("anyone"),
            Counterparty::Key(key) => f.write_str(key),
        }
    }
}

/// A 32-byte transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Txid(pub [u8; 32]);

impl Txid {
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

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero txid (used as a sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A spendable output reference: txid plus output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    /// The transaction containing the output.
    pub txid: Txid,
    /// Index of the output within the transaction.
    pub vout: u32,
}

impl Outpoint {
    /// Create a new outpoint.
    pub const fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Parse from the `"txid.vout"` string form.
    pub fn parse(s: &str) -> Option<Self> {
        let (txid, vout) = s.split_once('.')?;
        Some(Self {
            txid: Txid::from_hex(txid).ok()?,
            vout: vout.parse().ok()?,
        })
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid.to_hex(), self.vout)
    }
}

/// Identifier of a pending permission request, handed to the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub [u8; 16]);

impl RequestId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 16 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A calendar month in `YYYY-MM` form, used as a spending-accounting label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Month(String);

impl Month {
    /// The month containing the given unix timestamp (UTC).
    pub fn from_unix(secs: u64) -> Self {
        let formatted = chrono::DateTime::from_timestamp(secs as i64, 0)
            .map(|dt| dt.format("%Y-%m").to_string())
            .unwrap_or_else(|| "1970-01".to_string());
        Self(formatted)
    }

    /// Get the `YYYY-MM` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Get current unix time in seconds.
pub fn now_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txid_hex_roundtrip() {
        let txid = Txid::from_bytes([0x42; 32]);
        let hex = txid.to_hex();
        let recovered = Txid::from_hex(&hex).unwrap();
        assert_eq!(txid, recovered);
    }

    #[test]
    fn test_outpoint_parse_roundtrip() {
        let outpoint = Outpoint::new(Txid::from_bytes([0xab; 32]), 3);
        let s = outpoint.to_string();
        assert_eq!(Outpoint::parse(&s), Some(outpoint));
    }

    #[test]
    fn test_outpoint_parse_rejects_garbage() {
        assert_eq!(Outpoint::parse("nonsense"), None);
        assert_eq!(Outpoint::parse("abcd.0"), None);
    }

    #[test]
    fn test_security_level_u8_roundtrip() {
        for level in [
            SecurityLevel::Open,
            SecurityLevel::Protocol,
            SecurityLevel::Counterparty,
        ] {
            assert_eq!(SecurityLevel::from_u8(level.to_u8()), Some(level));
        }
        assert_eq!(SecurityLevel::from_u8(3), None);
    }

    #[test]
    fn test_counterparty_display_parse() {
        assert_eq!(Counterparty::parse("self"), Counterparty::Own);
        assert_eq!(Counterparty::parse("anyone"), Counterparty::Anyone);

        let key = Counterparty::Key("02abc".into());
        assert_eq!(Counterparty::parse(&key.to_string()), key);
    }

    #[test]
    fn test_month_from_unix() {
        // 2024-03-15T12:00:00Z
        let month = Month::from_unix(1_710_504_000);
        assert_eq!(month.as_str(), "2024-03");
    }

    #[test]
    fn test_request_ids_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_admin_baskets_distinct() {
        let baskets = [
            PermissionType::Protocol.admin_basket(),
            PermissionType::Basket.admin_basket(),
            PermissionType::Certificate.admin_basket(),
            PermissionType::Spending.admin_basket(),
        ];
        for basket in baskets {
            assert!(basket.starts_with("admin "));
        }
        assert_eq!(
            baskets.len(),
            baskets.iter().collect::<std::collections::HashSet<_>>().len()
        );
    }
}
