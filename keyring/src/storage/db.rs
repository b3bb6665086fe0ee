//! # SettingsDb — Durable Settings Store
//!
//! The persistence layer for wrapped keys, built on sled's embedded
//! key-value store.
//!
//! ## Tree Layout
//!
//! | Tree       | Key            | Value                      |
//! |------------|----------------|----------------------------|
//! | `settings` | name (UTF-8)   | hex string (UTF-8 bytes)   |
//!
//! ## Durability
//!
//! Every write is followed by a flush. The hierarchy writes at most two
//! settings per process lifetime, so there's nothing to batch and no reason
//! to leave a freshly generated key sitting in sled's write buffer.

use std::path::Path;

use sled::{Db, Tree};

use super::settings::{SettingsStore, StoreResult};
use crate::config::SETTINGS_TREE;
use crate::error::StoreError;

/// Settings store backed by a sled database.
///
/// sled trees support lock-free concurrent reads and serialized writes, so
/// `SettingsDb` can be shared via `Arc` without external synchronization.
#[derive(Debug, Clone)]
pub struct SettingsDb {
    db: Db,
    settings: Tree,
}

impl SettingsDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is cleaned up when dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let settings = db.open_tree(SETTINGS_TREE)?;
        Ok(Self { db, settings })
    }

    /// Number of settings stored.
    pub fn setting_count(&self) -> usize {
        self.settings.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn decode(name: &str, bytes: &[u8]) -> StoreResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|_| StoreError::Encoding(name.to_string()))
    }
}

impl SettingsStore for SettingsDb {
    fn exists_setting(&self, name: &str) -> StoreResult<bool> {
        Ok(self.settings.contains_key(name.as_bytes())?)
    }

    fn select_string_setting(&self, name: &str) -> StoreResult<String> {
        match self.settings.get(name.as_bytes())? {
            Some(bytes) => Self::decode(name, &bytes),
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    fn save_string_setting(&self, name: &str, value: &str) -> StoreResult<()> {
        self.settings.insert(name.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn save_string_setting_if_absent(
        &self,
        name: &str,
        value: &str,
    ) -> StoreResult<Option<String>> {
        let swapped = self.settings.compare_and_swap(
            name.as_bytes(),
            None as Option<&[u8]>,
            Some(value.as_bytes()),
        )?;

        match swapped {
            Ok(()) => {
                self.db.flush()?;
                Ok(None)
            }
            Err(conflict) => match conflict.current {
                Some(existing) => Self::decode(name, &existing).map(Some),
                // Someone deleted it between our read and swap. Not a state the
                // hierarchy ever produces.
                None => Err(StoreError::Unavailable(format!(
                    "conditional insert of {name} lost to a concurrent delete"
                ))),
            },
        }
    }
}
