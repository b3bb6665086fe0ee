//! # AES-256-GCM Key Wrapping
//!
//! Authenticated encryption for the key hierarchy. Root wraps instance,
//! root wraps nodes, instance wraps whatever deployment-local data the
//! application hands it. All of it goes through the two primitives here.
//!
//! ## Nonce management
//!
//! GCM is unforgiving about nonce reuse: two messages under the same key and
//! nonce leak the XOR of the plaintexts and let an attacker forge tags.
//!
//! Our strategy: a fresh random 96-bit nonce from the OS CSPRNG on every
//! call. No counters. The birthday bound for random 96-bit nonces is ~2^48
//! messages per key, and the hierarchy wraps a handful of keys per
//! deployment.
//!
//! ## Wire format
//!
//! ```text
//! +-----------+---------------------+----------+
//! | nonce(12) | ciphertext(len(pt)) | tag(16)  |
//! +-----------+---------------------+----------+
//! ```
//!
//! The tag is appended by the AEAD itself, so `decrypt()` only has to peel
//! the nonce off the front.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH};
use crate::crypto::keys::SymmetricKey;
use crate::error::{KeyringError, KeyringResult};

/// Fill `buf` from the OS CSPRNG.
///
/// Failure is surfaced as [`KeyringError::Entropy`]. There is no fallback
/// to a weaker generator.
pub(crate) fn fill_random(buf: &mut [u8]) -> KeyringResult<()> {
    OsRng.try_fill_bytes(buf).map_err(|err| {
        tracing::error!(error = %err, "OS random source failed");
        KeyringError::Entropy
    })
}

/// Generate a fresh AES-256 key from the OS CSPRNG.
pub fn generate_key() -> KeyringResult<SymmetricKey> {
    let mut bytes = [0u8; AES_KEY_LENGTH];
    fill_random(&mut bytes)?;
    let key = SymmetricKey::from_bytes(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    Ok(key)
}

fn cipher_for(key: &[u8]) -> KeyringResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key).map_err(|_| KeyringError::KeyDerivation {
        expected: AES_KEY_LENGTH,
        got: key.len(),
    })
}

fn seal(cipher: &Aes256Gcm, plaintext: &[u8]) -> KeyringResult<Vec<u8>> {
    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    fill_random(&mut nonce_bytes)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| KeyringError::Seal)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open(cipher: &Aes256Gcm, blob: &[u8]) -> KeyringResult<Vec<u8>> {
    if blob.len() < AES_NONCE_LENGTH {
        return Err(KeyringError::Format(format!(
            "wrapped blob is {} bytes, shorter than the {AES_NONCE_LENGTH}-byte nonce",
            blob.len()
        )));
    }

    let (nonce_bytes, ciphertext) = blob.split_at(AES_NONCE_LENGTH);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| KeyringError::Authentication)
}

/// Encrypt `plaintext` under `key` with AES-256-GCM and a random nonce.
///
/// Returns `nonce || ciphertext || tag`, always exactly
/// `12 + plaintext.len() + 16` bytes. Associated data is empty.
///
/// # Example
///
/// ```
/// use gatekey::crypto::aead::{decrypt, encrypt, generate_key};
///
/// let key = generate_key().unwrap();
/// let sealed = encrypt(&key, b"deployment secret").unwrap();
/// assert_eq!(sealed.len(), 12 + 17 + 16);
/// assert_eq!(decrypt(&key, &sealed).unwrap(), b"deployment secret");
/// ```
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> KeyringResult<Vec<u8>> {
    let cipher = cipher_for(key.as_bytes())?;
    seal(&cipher, plaintext)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// # Errors
///
/// - [`KeyringError::Format`] if the blob is shorter than the nonce.
/// - [`KeyringError::Authentication`] if the tag doesn't verify: wrong key,
///   flipped bit, truncated tail. We don't distinguish between these, and no
///   plaintext is ever returned alongside the error.
pub fn decrypt(key: &SymmetricKey, blob: &[u8]) -> KeyringResult<Vec<u8>> {
    let cipher = cipher_for(key.as_bytes())?;
    open(&cipher, blob)
}

/// Encrypt with a key provided as a byte slice (length-checked at runtime).
///
/// For key material that arrives from outside the type system, e.g. a
/// legacy config value. A slice that isn't 32 bytes fails with
/// [`KeyringError::KeyDerivation`].
pub fn encrypt_checked(key: &[u8], plaintext: &[u8]) -> KeyringResult<Vec<u8>> {
    let cipher = cipher_for(key)?;
    seal(&cipher, plaintext)
}

/// Decrypt with a key provided as a byte slice (length-checked at runtime).
pub fn decrypt_checked(key: &[u8], blob: &[u8]) -> KeyringResult<Vec<u8>> {
    let cipher = cipher_for(key)?;
    open(&cipher, blob)
}
