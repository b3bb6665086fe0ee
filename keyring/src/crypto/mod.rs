//! # Cryptographic Primitives
//!
//! Everything security-related in the keyring flows through here:
//!
//! - **AES-256-GCM** for wrapping keys and sealing data.
//! - **SHA-256** for fingerprints.
//! - **OS CSPRNG** for keys, nonces and salts. Nothing else.
//!
//! Thin, typed wrappers around audited implementations. If you're tempted to
//! optimize these functions, please reconsider.

pub mod aead;
pub mod hash;
pub mod keys;

pub use aead::{decrypt, encrypt, generate_key};
pub use hash::{random_salt_string, sha256, sha256_hex};
pub use keys::{RootKey, SymmetricKey};
