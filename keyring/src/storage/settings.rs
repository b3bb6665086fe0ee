//! The settings store contract the key hierarchy persists through.
//!
//! Values are hex strings under fixed names (`instance_key`, `nodes_key`).
//! The hierarchy never stores anything but wrapped keys here.

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Named string settings in some external store.
///
/// Implementations must be safe to share across threads. Each call is
/// treated as one atomic statement; the hierarchy performs no retries.
pub trait SettingsStore: Send + Sync {
    /// Whether a setting with this name exists.
    fn exists_setting(&self, name: &str) -> StoreResult<bool>;

    /// Read a setting. Missing settings fail with [`StoreError::NotFound`].
    fn select_string_setting(&self, name: &str) -> StoreResult<String>;

    /// Insert or overwrite a setting.
    fn save_string_setting(&self, name: &str, value: &str) -> StoreResult<()>;

    /// Insert a setting only if nobody has written it yet.
    ///
    /// Returns `None` when `value` was stored, or `Some(existing)` when
    /// another writer got there first and `value` was discarded. Two nodes
    /// racing through first bootstrap both call this; exactly one wins.
    ///
    /// The default is a plain exists-then-save and is NOT atomic. Stores
    /// that can do a conditional insert should override it.
    fn save_string_setting_if_absent(
        &self,
        name: &str,
        value: &str,
    ) -> StoreResult<Option<String>> {
        if self.exists_setting(name)? {
            return self.select_string_setting(name).map(Some);
        }
        self.save_string_setting(name, value)?;
        Ok(None)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<S> {
    fn exists_setting(&self, name: &str) -> StoreResult<bool> {
        (**self).exists_setting(name)
    }

    fn select_string_setting(&self, name: &str) -> StoreResult<String> {
        (**self).select_string_setting(name)
    }

    fn save_string_setting(&self, name: &str, value: &str) -> StoreResult<()> {
        (**self).save_string_setting(name, value)
    }

    fn save_string_setting_if_absent(
        &self,
        name: &str,
        value: &str,
    ) -> StoreResult<Option<String>> {
        (**self).save_string_setting_if_absent(name, value)
    }
}
