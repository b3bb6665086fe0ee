//! # CLI Interface
//!
//! Defines the command-line argument structure for `gatekey-node` using
//! `clap` derive. Every path and secret can also come from the environment,
//! which is how container deployments are expected to supply them.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// GateKey node key management.
///
/// Provisions root keys, bootstraps the instance and nodes keys against the
/// local settings database, and moves the wrapped nodes key between cluster
/// members.
#[derive(Parser, Debug)]
#[command(
    name = "gatekey-node",
    about = "GateKey key hierarchy management",
    version,
    propagate_version = true
)]
pub struct GateKeyCli {
    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "GATEKEY_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new root key and write it, hex-encoded, to a file.
    InitRoot(InitRootArgs),
    /// Load or generate the instance and nodes keys.
    Bootstrap(NodeArgs),
    /// Bootstrap, then print the wrapped nodes key record as JSON for a peer.
    ExportNodesKey(NodeArgs),
    /// Adopt a nodes key record exported by a peer.
    ImportNodesKey(ImportArgs),
    /// Print a fresh random salt string.
    Salt,
    /// Print the SHA-256 hex digest of a string.
    Hash(HashArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for `init-root`.
#[derive(Args, Debug)]
pub struct InitRootArgs {
    /// Where to write the new root key. Refuses to overwrite.
    #[arg(long, short = 'o', env = "GATEKEY_ROOT_KEY_FILE")]
    pub out: PathBuf,
}

/// Where the node keeps its settings and where its root key comes from.
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Directory holding the settings database. Created on first run.
    #[arg(long, short = 'd', env = "GATEKEY_DATA_DIR", default_value = "./gatekey-data")]
    pub data_dir: PathBuf,

    /// Hex-encoded root key.
    ///
    /// **Avoid in production** — it ends up in shell history and process
    /// listings. Use `--root-key-file` instead.
    #[arg(long, env = "GATEKEY_ROOT_KEY", hide_env_values = true)]
    pub root_key: Option<String>,

    /// File containing the hex-encoded root key.
    #[arg(long, env = "GATEKEY_ROOT_KEY_FILE")]
    pub root_key_file: Option<PathBuf>,
}

/// Arguments for `import-nodes-key`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// JSON file holding the nodes key record exported by a peer.
    #[arg(long, short = 'r')]
    pub record: PathBuf,
}

/// Arguments for `hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Text to digest.
    pub text: String,
}
