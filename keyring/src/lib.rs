// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # GateKey — Key Hierarchy Library
//!
//! A root secret protects a per-deployment instance key and a cluster-wide
//! nodes key. Both are generated once, persisted only in wrapped form, and
//! recovered by unwrapping on every later start.
//!
//! ## Architecture
//!
//! - **crypto** — AES-256-GCM wrapping, SHA-256, salts, key types.
//! - **hierarchy** — bootstrap and ownership of instance and nodes keys.
//! - **transport** — the wrapped hex form nodes exchange to share a key.
//! - **storage** — the settings store the wrapped keys live in.
//! - **config** — lengths, setting names, tree names.
//! - **error** — one error enum for everything above.
//!
//! ## Usage
//!
//! ```
//! use gatekey::crypto::RootKey;
//! use gatekey::hierarchy::{KeyHierarchy, KeySlot};
//! use gatekey::storage::MemorySettingsStore;
//!
//! let root = RootKey::generate().unwrap();
//! let store = MemorySettingsStore::new();
//! let keys = KeyHierarchy::bootstrap(root, &store).unwrap();
//!
//! let sealed = keys.encrypt(b"upstream password", KeySlot::Instance).unwrap();
//! assert_eq!(keys.decrypt(&sealed, KeySlot::Instance).unwrap(), b"upstream password");
//! ```
//!
//! ## Design Philosophy
//!
//! 1. A key never leaves the process unwrapped.
//! 2. An unwrap either authenticates or fails. No partial plaintext.
//! 3. Bootstrap once, then read-only. No rotation path to get wrong.

pub mod config;
pub mod crypto;
pub mod error;
pub mod hierarchy;
pub mod storage;
pub mod transport;

pub use error::{KeyringError, KeyringResult, StoreError};
pub use hierarchy::{KeyHierarchy, KeySlot};
pub use transport::NodesKeyRecord;
