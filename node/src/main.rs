// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # GateKey Node
//!
//! Entry point for the `gatekey-node` binary. This is the composition root:
//! it resolves the root key from configuration, opens the settings database,
//! and bootstraps the key hierarchy before doing anything with it.
//!
//! - `init-root`        — provision a new root key file
//! - `bootstrap`        — load or generate the instance and nodes keys
//! - `export-nodes-key` — print the wrapped nodes key record for a peer
//! - `import-nodes-key` — adopt a peer's nodes key record
//! - `salt` / `hash`    — salt and digest utilities
//! - `version`          — print build version information

mod cli;
mod config;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;

use gatekey::config::{INSTANCE_KEY_SETTING, NODES_KEY_SETTING};
use gatekey::crypto::{random_salt_string, sha256_hex, RootKey};
use gatekey::storage::{SettingsDb, SettingsStore};
use gatekey::{KeyHierarchy, NodesKeyRecord};

use cli::{Commands, GateKeyCli, NodeArgs};

fn main() -> Result<()> {
    let cli = GateKeyCli::parse();
    logging::init_logging("gatekey_node=info,gatekey=info", cli.log_format);

    match cli.command {
        Commands::InitRoot(args) => init_root(&args.out),
        Commands::Bootstrap(args) => bootstrap(&args),
        Commands::ExportNodesKey(args) => export_nodes_key(&args),
        Commands::ImportNodesKey(args) => import_nodes_key(&args.node, &args.record),
        Commands::Salt => {
            println!("{}", random_salt_string().context("failed to draw salt")?);
            Ok(())
        }
        Commands::Hash(args) => {
            println!("{}", sha256_hex(&args.text));
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Generates a root key and writes it to a new file, owner-readable only.
fn init_root(out: &Path) -> Result<()> {
    if out.exists() {
        bail!("refusing to overwrite existing root key file {}", out.display());
    }

    let root = RootKey::generate().context("failed to generate root key")?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(out)
        .with_context(|| format!("failed to create root key file {}", out.display()))?;
    writeln!(file, "{}", root.to_hex())
        .with_context(|| format!("failed to write root key file {}", out.display()))?;

    tracing::info!(path = %out.display(), "root key generated");
    println!("Root key written to {}", out.display());
    println!("Distribute it to every cluster member through your secret store.");
    Ok(())
}

/// Opens the settings database and bootstraps the hierarchy. Any failure
/// here aborts the process; a node must never run with an undefined key.
fn open_hierarchy(args: &NodeArgs) -> Result<(SettingsDb, KeyHierarchy)> {
    let root = config::resolve_root_key(args)?;
    let db = open_settings(&args.data_dir)?;
    let hierarchy = KeyHierarchy::bootstrap(root, &db).context("key hierarchy bootstrap failed")?;
    Ok((db, hierarchy))
}

fn open_settings(data_dir: &Path) -> Result<SettingsDb> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
    let db_path = data_dir.join("settings");
    let db = SettingsDb::open(&db_path)
        .with_context(|| format!("failed to open settings database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "settings database opened");
    Ok(db)
}

fn bootstrap(args: &NodeArgs) -> Result<()> {
    let (db, _hierarchy) = open_hierarchy(args)?;

    println!("Key hierarchy ready.");
    print_fingerprints(&db)?;
    Ok(())
}

fn export_nodes_key(args: &NodeArgs) -> Result<()> {
    let (_db, hierarchy) = open_hierarchy(args)?;
    let record = hierarchy
        .hex_encrypted_nodes_key()
        .context("nodes key missing after bootstrap")?;

    println!("{}", record.to_json()?);
    Ok(())
}

fn import_nodes_key(args: &NodeArgs, record_path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(record_path)
        .with_context(|| format!("failed to read nodes key record {}", record_path.display()))?;
    let record = NodesKeyRecord::from_json(&json)
        .with_context(|| format!("invalid nodes key record {}", record_path.display()))?;

    let root = config::resolve_root_key(args)?;
    let db = open_settings(&args.data_dir)?;

    let mut hierarchy = KeyHierarchy::new(root);
    hierarchy
        .load_instance_key(&db)
        .context("instance key bootstrap failed")?;
    hierarchy
        .adopt_nodes_key(&db, &record)
        .context("peer nodes key rejected")?;

    println!("Nodes key adopted.");
    print_fingerprints(&db)?;
    Ok(())
}

/// Prints SHA-256 fingerprints of the wrapped settings so operators can
/// compare nodes without exposing anything secret.
fn print_fingerprints(db: &SettingsDb) -> Result<()> {
    for name in [INSTANCE_KEY_SETTING, NODES_KEY_SETTING] {
        if db.exists_setting(name)? {
            let wrapped = db.select_string_setting(name)?;
            println!("  {:<13}: {}", name, sha256_hex(&wrapped));
        } else {
            println!("  {:<13}: (not persisted)", name);
        }
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("gatekey-node {}", env!("CARGO_PKG_VERSION"));
    println!("cipher       {}", gatekey::config::SYMMETRIC_ALGORITHM);
}
