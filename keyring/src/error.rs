//! Error types for the key hierarchy.
//!
//! Every fallible operation in this crate returns a [`KeyringError`].
//! Persistence failures are wrapped as [`StoreError`] so callers can tell an
//! unreachable store apart from a key that refused to unwrap.

use thiserror::Error;

/// Errors raised by the settings store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("setting not found: {0}")]
    NotFound(String),

    #[error("setting is not valid UTF-8: {0}")]
    Encoding(String),

    /// Backend-specific failure that doesn't fit the variants above.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur anywhere in the key hierarchy.
///
/// `Authentication` deliberately carries no detail. Whether the key was
/// wrong or the blob was tampered with is none of the caller's business,
/// and certainly none of an attacker's.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// The OS random source could not supply the requested bytes.
    #[error("secure random source unavailable")]
    Entropy,

    /// The AES-256-GCM cipher could not be constructed from the key material.
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    KeyDerivation {
        /// Required key length.
        expected: usize,
        /// Length that was supplied.
        got: usize,
    },

    /// A wrapped blob or hex string is structurally malformed.
    #[error("malformed wrapped data: {0}")]
    Format(String),

    /// Tag verification failed on unwrap.
    #[error("authentication failed -- wrong key or corrupted ciphertext")]
    Authentication,

    /// Sealing failed. Only reachable for plaintexts beyond the GCM limit.
    #[error("encryption failed")]
    Seal,

    /// A hierarchy key was read before bootstrap made it ready.
    #[error("key not loaded: {0}")]
    KeyNotLoaded(&'static str),

    /// A different key is already persisted under this setting. Keys are
    /// generated or adopted once per deployment and never replaced.
    #[error("a different key is already persisted as {0}")]
    Conflict(&'static str),

    #[error("settings store error: {0}")]
    Store(#[from] StoreError),
}

pub type KeyringResult<T> = Result<T, KeyringError>;

impl From<hex::FromHexError> for KeyringError {
    fn from(err: hex::FromHexError) -> Self {
        KeyringError::Format(format!("invalid hex: {err}"))
    }
}
