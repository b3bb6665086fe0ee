//! # Keyring Constants
//!
//! Every magic number in the key hierarchy lives here. Lengths, setting
//! names, tree names. If a persisted setting name changes, every deployment
//! out there loses track of its wrapped keys, so treat the names below as
//! frozen.

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// AES-256-GCM for every wrap in the hierarchy. 256-bit keys, 96-bit nonces,
/// 128-bit authentication tags.
pub const SYMMETRIC_ALGORITHM: &str = "AES-256-GCM";

/// AES-256-GCM key length in bytes. Root, instance and nodes keys all share it.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. Twelve. Not 16. Not 8.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// Per-wrap overhead: nonce prefix plus tag suffix.
pub const WRAP_OVERHEAD: usize = AES_NONCE_LENGTH + AES_TAG_LENGTH;

/// Length of a wrapped 32-byte key, before hex encoding.
pub const WRAPPED_KEY_LENGTH: usize = AES_KEY_LENGTH + WRAP_OVERHEAD;

/// Random bytes drawn for a salt string. Hex-encoded this becomes 32 chars.
pub const SALT_LENGTH: usize = 16;

/// SHA-256 digest length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Persisted Setting Names
// ---------------------------------------------------------------------------

/// Setting that holds the hex-encoded, root-wrapped instance key.
pub const INSTANCE_KEY_SETTING: &str = "instance_key";

/// Setting that holds the hex-encoded, root-wrapped nodes key.
pub const NODES_KEY_SETTING: &str = "nodes_key";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Name of the sled tree that backs the settings store.
pub const SETTINGS_TREE: &str = "settings";
