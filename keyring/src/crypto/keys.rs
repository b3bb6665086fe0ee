//! # Key Material
//!
//! The two key types of the hierarchy:
//!
//! - [`SymmetricKey`] — 32 bytes of AES-256 key material. Instance and nodes
//!   keys are held as these.
//! - [`RootKey`] — the top of the hierarchy. Same shape, separate type, so a
//!   function that wants the root can't be handed the instance key by mistake.
//!
//! ## Security considerations
//!
//! - Key bytes are zeroized on drop.
//! - `Debug` prints a redaction marker, never the bytes.
//! - Neither type implements `Serialize` or `Display`. Putting a key on the
//!   wire means wrapping it first; see the `transport` module.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::AES_KEY_LENGTH;
use crate::crypto::aead;
use crate::error::{KeyringError, KeyringResult};

/// A 32-byte AES-256 key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; AES_KEY_LENGTH],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; AES_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Build a key from a runtime-length slice, typically freshly unwrapped
    /// plaintext. Anything but exactly 32 bytes is a format error.
    pub fn from_slice(bytes: &[u8]) -> KeyringResult<Self> {
        let bytes: [u8; AES_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            KeyringError::Format(format!(
                "expected {AES_KEY_LENGTH}-byte key, got {} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.bytes
    }
}

// Constant-time comparison. Short-circuiting on the first differing byte
// would turn equality checks into a timing oracle.
impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// The root of the key hierarchy.
///
/// Every persisted key is wrapped with this one, and every node in a
/// cluster must hold the same value, otherwise peers can't unwrap each
/// other's nodes key. It is supplied by configuration at startup and is
/// never persisted by this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct RootKey(SymmetricKey);

impl RootKey {
    /// Wrap raw root key bytes.
    pub fn from_bytes(bytes: [u8; AES_KEY_LENGTH]) -> Self {
        Self(SymmetricKey::from_bytes(bytes))
    }

    /// Parse a root key from its hex form, as found in config files and
    /// environment variables. Surrounding whitespace is ignored.
    pub fn from_hex(hex_key: &str) -> KeyringResult<Self> {
        let mut raw = hex::decode(hex_key.trim())?;
        let key = SymmetricKey::from_slice(&raw);
        raw.zeroize();
        Ok(Self(key?))
    }

    /// Draw a fresh root key from the OS random source.
    ///
    /// Only the provisioning path calls this. A running node reads its root
    /// key from configuration.
    pub fn generate() -> KeyringResult<Self> {
        Ok(Self(aead::generate_key()?))
    }

    /// Hex form for provisioning. The caller owns whatever it writes this to.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Borrow the root as a plain symmetric key for the AEAD primitives.
    pub fn as_key(&self) -> &SymmetricKey {
        &self.0
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_rejects_wrong_lengths() {
        assert!(SymmetricKey::from_slice(&[0u8; 31]).is_err());
        assert!(SymmetricKey::from_slice(&[0u8; 33]).is_err());
        assert!(SymmetricKey::from_slice(&[]).is_err());
        assert!(SymmetricKey::from_slice(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let key = SymmetricKey::from_bytes([0xAB; 32]);
        let printed = format!("{key:?}");
        assert!(!printed.contains("ab"));
        assert!(!printed.contains("171"));
        assert!(printed.contains("redacted"));

        let root = RootKey::from_bytes([0xAB; 32]);
        assert_eq!(format!("{root:?}"), "RootKey(<redacted>)");
    }

    #[test]
    fn test_equality_compares_all_bytes() {
        let a = SymmetricKey::from_bytes([1u8; 32]);
        let mut other = [1u8; 32];
        other[31] = 2;
        let b = SymmetricKey::from_bytes(other);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_root_key_hex_roundtrip() {
        let root = RootKey::generate().unwrap();
        let parsed = RootKey::from_hex(&root.to_hex()).unwrap();
        assert_eq!(root, parsed);
    }

    #[test]
    fn test_root_key_hex_tolerates_whitespace() {
        let hex_key = format!("  {}\n", "11".repeat(32));
        let root = RootKey::from_hex(&hex_key).unwrap();
        assert_eq!(root.as_key().as_bytes(), &[0x11; 32]);
    }

    #[test]
    fn test_root_key_rejects_short_or_bad_hex() {
        assert!(matches!(
            RootKey::from_hex("abcd"),
            Err(KeyringError::Format(_))
        ));
        assert!(matches!(
            RootKey::from_hex(&"zz".repeat(32)),
            Err(KeyringError::Format(_))
        ));
    }
}
