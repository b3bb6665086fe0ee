//! # Storage Module
//!
//! Where wrapped keys go to rest. The hierarchy only ever talks to the
//! [`SettingsStore`] trait; which backend sits behind it is the composition
//! root's call.
//!
//! ```text
//! settings.rs — SettingsStore trait (exists / select / save / save-if-absent)
//! db.rs       — sled-backed SettingsDb, durable
//! memory.rs   — MemorySettingsStore, for tests and throwaway deployments
//! ```

pub mod db;
pub mod memory;
pub mod settings;

pub use db::SettingsDb;
pub use memory::MemorySettingsStore;
pub use settings::{SettingsStore, StoreResult};
