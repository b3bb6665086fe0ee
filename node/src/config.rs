//! Root key resolution.
//!
//! An explicit `--root-key` wins over `--root-key-file`. Neither given is a
//! configuration error; the node never falls back to a built-in key.

use anyhow::{bail, Context, Result};
use std::path::Path;

use gatekey::crypto::RootKey;

use crate::cli::NodeArgs;

/// Resolve the root key from CLI arguments or their environment fallbacks.
pub fn resolve_root_key(args: &NodeArgs) -> Result<RootKey> {
    if let Some(hex_key) = &args.root_key {
        tracing::warn!("root key supplied inline; prefer --root-key-file in production");
        return RootKey::from_hex(hex_key).context("invalid --root-key");
    }

    match &args.root_key_file {
        Some(path) => read_root_key_file(path),
        None => bail!("no root key configured: pass --root-key-file or set GATEKEY_ROOT_KEY_FILE"),
    }
}

/// Read a hex root key from a file. Surrounding whitespace is ignored.
pub fn read_root_key_file(path: &Path) -> Result<RootKey> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read root key file {}", path.display()))?;
    RootKey::from_hex(&contents)
        .with_context(|| format!("root key file {} is not a 32-byte hex key", path.display()))
}
