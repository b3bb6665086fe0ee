//! # Hashing & Salts
//!
//! SHA-256 digests for content fingerprinting and random salt strings for
//! whoever does password hashing downstream. Neither touches the key
//! hierarchy.
//!
//! Salts come from the same OS CSPRNG as keys and nonces. This module only
//! hands them out; storing them next to the hashed value is the caller's job.

use sha2::{Digest, Sha256};

use crate::config::{HASH_OUTPUT_LENGTH, SALT_LENGTH};
use crate::crypto::aead::fill_random;
use crate::error::KeyringResult;

/// Compute the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; HASH_OUTPUT_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 of a string, as 64 lowercase hex characters.
///
/// # Example
///
/// ```
/// use gatekey::crypto::sha256_hex;
///
/// assert_eq!(
///     sha256_hex("abc"),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn sha256_hex(text: &str) -> String {
    hex::encode(sha256(text.as_bytes()))
}

/// Draw 16 random bytes and return them as a 32-character lowercase hex
/// string. Fresh on every call.
pub fn random_salt_string() -> KeyringResult<String> {
    let mut salt = [0u8; SALT_LENGTH];
    fill_random(&mut salt)?;
    Ok(hex::encode(salt))
}
