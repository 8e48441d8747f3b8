//! Token script envelope.
//!
//! A permission token's locking script embeds the type-specific encrypted
//! fields in a versioned CBOR envelope behind a 2-byte magic prefix, so
//! foreign scripts sitting in an admin basket are rejected without
//! touching the cipher.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenError};

/// Magic prefix identifying a token script.
pub const SCRIPT_MAGIC: [u8; 2] = [0x43, 0x56];

/// Format identifier for the embedded field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScriptFormat {
    /// CBOR array of byte strings.
    CborV1 = 1,
}

/// The decoded body of a token locking script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenScript {
    /// Encoding of the field list.
    pub format: ScriptFormat,

    /// The ordered encrypted fields.
    pub fields: Vec<Bytes>,
}

impl TokenScript {
    /// Wrap an ordered field list.
    pub fn new(fields: Vec<Bytes>) -> Self {
        Self {
            format: ScriptFormat::CborV1,
            fields,
        }
    }

    /// Serialize to locking-script bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = SCRIPT_MAGIC.to_vec();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from locking-script bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let body = bytes
            .strip_prefix(&SCRIPT_MAGIC)
            .ok_or_else(|| TokenError::MalformedScript("missing magic prefix".into()))?;
        ciborium::from_reader(body).map_err(|e| TokenError::MalformedScript(e.to_string()))
    }

    /// Number of embedded fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_roundtrip() {
        let script = TokenScript::new(vec![
            Bytes::from_static(b"alpha"),
            Bytes::from_static(b"beta"),
            Bytes::from_static(b""),
        ]);

        let bytes = script.to_bytes();
        let recovered = TokenScript::from_bytes(&bytes).unwrap();

        assert_eq!(script, recovered);
        assert_eq!(recovered.field_count(), 3);
    }

    #[test]
    fn test_missing_magic_rejected() {
        let script = TokenScript::new(vec![Bytes::from_static(b"alpha")]);
        let mut bytes = script.to_bytes();
        bytes[0] ^= 0xff;

        assert!(matches!(
            TokenScript::from_bytes(&bytes),
            Err(TokenError::MalformedScript(_))
        ));
    }

    #[test]
    fn test_garbled_body_rejected() {
        let mut bytes = SCRIPT_MAGIC.to_vec();
        bytes.extend_from_slice(&[0xff, 0x00, 0x13, 0x37]);

        assert!(TokenScript::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_truncated_input_rejected() {
        assert!(TokenScript::from_bytes(&[0x43]).is_err());
        assert!(TokenScript::from_bytes(&[]).is_err());
    }
}
