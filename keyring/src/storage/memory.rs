//! In-memory settings store.
//!
//! Used by tests and by ephemeral deployments that are happy to regenerate
//! their keys on every start. Nothing here survives a restart.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::settings::{SettingsStore, StoreResult};
use crate::error::StoreError;

/// A `HashMap` behind a `parking_lot::RwLock`.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of settings currently held.
    pub fn len(&self) -> usize {
        self.settings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.read().is_empty()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn exists_setting(&self, name: &str) -> StoreResult<bool> {
        Ok(self.settings.read().contains_key(name))
    }

    fn select_string_setting(&self, name: &str) -> StoreResult<String> {
        self.settings
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn save_string_setting(&self, name: &str, value: &str) -> StoreResult<()> {
        self.settings
            .write()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn save_string_setting_if_absent(
        &self,
        name: &str,
        value: &str,
    ) -> StoreResult<Option<String>> {
        let mut settings = self.settings.write();
        if let Some(existing) = settings.get(name) {
            return Ok(Some(existing.clone()));
        }
        settings.insert(name.to_string(), value.to_string());
        Ok(None)
    }
}
