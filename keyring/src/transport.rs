//! # Nodes Key Transport
//!
//! Moving the cluster-wide nodes key between replicas without ever putting
//! raw key bytes on the wire. The sender wraps with the root key and
//! hex-encodes; the receiver decodes and unwraps with its own root key.
//!
//! Both sides must hold the same root key. A replica provisioned with a
//! different root gets an [`KeyringError::Authentication`] on receipt, not a
//! silently wrong nodes key.
//!
//! How the [`NodesKeyRecord`] travels (HTTP, RPC, a file on a USB stick) is
//! the calling layer's business.

use serde::{Deserialize, Serialize};

use crate::crypto::aead;
use crate::crypto::keys::{RootKey, SymmetricKey};
use crate::error::{KeyringError, KeyringResult};

/// Wrap `key` with the root key and hex-encode it for a peer.
pub fn crypt_key_to_node_hex_key(root: &RootKey, key: &SymmetricKey) -> KeyringResult<String> {
    let wrapped = aead::encrypt(root.as_key(), key.as_bytes())?;
    Ok(hex::encode(wrapped))
}

/// Decode and unwrap a peer's hex-encoded key with the root key.
///
/// # Errors
///
/// - [`KeyringError::Format`] for bad hex, a blob shorter than the nonce, or
///   an unwrapped payload that isn't a 32-byte key.
/// - [`KeyringError::Authentication`] if the root keys differ or the payload
///   was modified in transit.
pub fn node_hex_key_to_crypt_key(root: &RootKey, hex_key: &str) -> KeyringResult<SymmetricKey> {
    let wrapped = hex::decode(hex_key.trim())?;
    let mut plaintext = aead::decrypt(root.as_key(), &wrapped)?;
    let key = SymmetricKey::from_slice(&plaintext);
    zeroize::Zeroize::zeroize(&mut plaintext);
    key
}

/// The payload a node serves to joining cluster members: the nodes key,
/// wrapped with the root key and hex-encoded. Never the raw key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesKeyRecord {
    hex_encrypted_key: String,
}

impl NodesKeyRecord {
    /// Wrap a record around an already wrapped, hex-encoded key.
    pub fn new(hex_encrypted_key: impl Into<String>) -> Self {
        Self {
            hex_encrypted_key: hex_encrypted_key.into(),
        }
    }

    /// Wrap `key` with `root` and package it for transport.
    pub fn seal(root: &RootKey, key: &SymmetricKey) -> KeyringResult<Self> {
        Ok(Self::new(crypt_key_to_node_hex_key(root, key)?))
    }

    /// The wrapped key, hex-encoded.
    pub fn hex_encrypted_key(&self) -> &str {
        &self.hex_encrypted_key
    }

    /// Recover the raw key with the local root key.
    pub fn unwrap_key(&self, root: &RootKey) -> KeyringResult<SymmetricKey> {
        if self.hex_encrypted_key.is_empty() {
            return Err(KeyringError::Format("empty nodes key record".to_string()));
        }
        node_hex_key_to_crypt_key(root, &self.hex_encrypted_key)
    }

    pub fn to_json(&self) -> KeyringResult<String> {
        serde_json::to_string(self)
            .map_err(|e| KeyringError::Format(format!("nodes key record: {e}")))
    }

    pub fn from_json(json: &str) -> KeyringResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| KeyringError::Format(format!("nodes key record: {e}")))
    }
}
