//! # Key Hierarchy
//!
//! ```text
//!                 RootKey  (configuration, never persisted)
//!                /       \
//!        InstanceKey    NodesKey
//!     (per deployment)  (shared by every replica)
//! ```
//!
//! [`KeyHierarchy`] brings the instance and nodes keys from "unknown" to
//! "ready" once per process start. For each key it checks the settings
//! store:
//!
//! - **absent** — generate a fresh key, wrap it with the root key, persist
//!   the hex form, keep the raw key in memory.
//! - **present** — read the hex form, unwrap it with the root key, keep the
//!   raw key in memory.
//!
//! An unwrap failure means the persisted value is corrupt or the root key
//! changed. Either way the process must not carry on with an undefined key,
//! so the error goes straight back to the caller.
//!
//! ## Lifecycle
//!
//! Bootstrap takes `&mut self` and runs before anything is served. Once it
//! returns, the composition root puts the hierarchy behind an `Arc` and every
//! reader shares it immutably. There is no rotation path, and the borrow
//! checker makes sure nobody sneaks one in.
//!
//! ## Racing first bootstraps
//!
//! Two nodes bootstrapping against an empty shared store would each generate
//! their own nodes key. Persisting goes through
//! [`SettingsStore::save_string_setting_if_absent`], so only one write
//! lands; the loser throws its key away and adopts the winner's.

use tracing::{error, info, warn};

use crate::config::{INSTANCE_KEY_SETTING, NODES_KEY_SETTING};
use crate::crypto::aead;
use crate::crypto::keys::{RootKey, SymmetricKey};
use crate::error::{KeyringError, KeyringResult};
use crate::storage::SettingsStore;
use crate::transport::{crypt_key_to_node_hex_key, node_hex_key_to_crypt_key, NodesKeyRecord};

/// Which key a convenience encrypt/decrypt should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    /// The root key. Used for wrapping other keys.
    Root,
    /// The per-deployment instance key. Used for deployment-local data.
    Instance,
}

/// A hierarchy key recovered or generated during bootstrap, together with
/// the wrapped hex form that is (or should be) in the store.
struct LoadedKey {
    key: SymmetricKey,
    hex_wrapped: String,
}

/// Owner of the root, instance and nodes keys.
#[derive(Debug)]
pub struct KeyHierarchy {
    root: RootKey,
    instance_key: Option<SymmetricKey>,
    nodes_key: Option<SymmetricKey>,
    hex_encrypted_nodes_key: Option<String>,
}

impl KeyHierarchy {
    /// A hierarchy with only the root key known. Both other keys start out
    /// unbootstrapped.
    pub fn new(root: RootKey) -> Self {
        Self {
            root,
            instance_key: None,
            nodes_key: None,
            hex_encrypted_nodes_key: None,
        }
    }

    /// Load the instance key, then the nodes key. The usual entry point.
    pub fn bootstrap<S>(root: RootKey, store: &S) -> KeyringResult<Self>
    where
        S: SettingsStore + ?Sized,
    {
        let mut hierarchy = Self::new(root);
        hierarchy.load_instance_key(store)?;
        hierarchy.load_nodes_key(store)?;
        info!("key hierarchy ready");
        Ok(hierarchy)
    }

    /// Recover the instance key from `instance_key`, or generate and persist
    /// one if the setting doesn't exist yet.
    pub fn load_instance_key<S>(&mut self, store: &S) -> KeyringResult<()>
    where
        S: SettingsStore + ?Sized,
    {
        let loaded = load_or_generate(&self.root, store, INSTANCE_KEY_SETTING)?;
        self.instance_key = Some(loaded.key);
        Ok(())
    }

    /// Same as [`load_instance_key`](Self::load_instance_key) for
    /// `nodes_key`, additionally retaining the wrapped hex form so it can be
    /// served to joining replicas.
    pub fn load_nodes_key<S>(&mut self, store: &S) -> KeyringResult<()>
    where
        S: SettingsStore + ?Sized,
    {
        let loaded = load_or_generate(&self.root, store, NODES_KEY_SETTING)?;
        self.nodes_key = Some(loaded.key);
        self.hex_encrypted_nodes_key = Some(loaded.hex_wrapped);
        Ok(())
    }

    /// Take the nodes key a peer handed us instead of loading or generating
    /// one. This is how a replica joins a cluster: the record is unwrapped
    /// with our own root key, persisted under `nodes_key`, and becomes ours.
    ///
    /// A store that already holds the same key (under any nonce) is left as
    /// it is. A store holding a different key fails with
    /// [`KeyringError::Conflict`] and nothing changes.
    pub fn adopt_nodes_key<S>(&mut self, store: &S, record: &NodesKeyRecord) -> KeyringResult<()>
    where
        S: SettingsStore + ?Sized,
    {
        let key = record.unwrap_key(&self.root).map_err(|err| {
            error!(error = %err, "peer nodes key rejected");
            err
        })?;

        if let Some(current) = &self.nodes_key {
            if current != &key {
                error!(
                    setting = NODES_KEY_SETTING,
                    "refusing to replace the loaded nodes key with a peer's"
                );
                return Err(KeyringError::Conflict(NODES_KEY_SETTING));
            }
        }

        let offered = record.hex_encrypted_key();
        let hex_wrapped = match store.save_string_setting_if_absent(NODES_KEY_SETTING, offered) {
            Ok(None) => offered.to_string(),
            Ok(Some(existing)) => {
                let persisted = unwrap_persisted(&self.root, NODES_KEY_SETTING, &existing)?;
                if persisted != key {
                    error!(
                        setting = NODES_KEY_SETTING,
                        "refusing to replace the persisted nodes key with a peer's"
                    );
                    return Err(KeyringError::Conflict(NODES_KEY_SETTING));
                }
                info!(setting = NODES_KEY_SETTING, "peer nodes key already persisted");
                existing
            }
            Err(err) => {
                warn!(
                    setting = NODES_KEY_SETTING,
                    error = %err,
                    "failed to persist adopted nodes key; it is held in memory for this run only"
                );
                offered.to_string()
            }
        };

        info!(setting = NODES_KEY_SETTING, "adopted nodes key from peer");
        self.nodes_key = Some(key);
        self.hex_encrypted_nodes_key = Some(hex_wrapped);
        Ok(())
    }

    /// The wrapped nodes key, for a joining replica. `None` until the nodes
    /// key has been loaded or adopted.
    pub fn hex_encrypted_nodes_key(&self) -> Option<NodesKeyRecord> {
        self.hex_encrypted_nodes_key
            .as_ref()
            .map(|hex_key| NodesKeyRecord::new(hex_key.clone()))
    }

    pub fn root_key(&self) -> &RootKey {
        &self.root
    }

    pub fn instance_key(&self) -> KeyringResult<&SymmetricKey> {
        self.instance_key
            .as_ref()
            .ok_or(KeyringError::KeyNotLoaded(INSTANCE_KEY_SETTING))
    }

    pub fn nodes_key(&self) -> KeyringResult<&SymmetricKey> {
        self.nodes_key
            .as_ref()
            .ok_or(KeyringError::KeyNotLoaded(NODES_KEY_SETTING))
    }

    /// Both keys loaded.
    pub fn is_ready(&self) -> bool {
        self.instance_key.is_some() && self.nodes_key.is_some()
    }

    /// Encrypt with the root or instance key.
    pub fn encrypt(&self, plaintext: &[u8], slot: KeySlot) -> KeyringResult<Vec<u8>> {
        aead::encrypt(self.key_for(slot)?, plaintext)
    }

    /// Decrypt with the root or instance key.
    pub fn decrypt(&self, blob: &[u8], slot: KeySlot) -> KeyringResult<Vec<u8>> {
        aead::decrypt(self.key_for(slot)?, blob)
    }

    /// Wrap `key` with the root key for a peer. See [`crate::transport`].
    pub fn crypt_key_to_node_hex_key(&self, key: &SymmetricKey) -> KeyringResult<String> {
        crypt_key_to_node_hex_key(&self.root, key)
    }

    /// Unwrap a peer's hex key with the root key. See [`crate::transport`].
    pub fn node_hex_key_to_crypt_key(&self, hex_key: &str) -> KeyringResult<SymmetricKey> {
        node_hex_key_to_crypt_key(&self.root, hex_key)
    }

    fn key_for(&self, slot: KeySlot) -> KeyringResult<&SymmetricKey> {
        match slot {
            KeySlot::Root => Ok(self.root.as_key()),
            KeySlot::Instance => self.instance_key(),
        }
    }
}

fn load_or_generate<S>(root: &RootKey, store: &S, name: &'static str) -> KeyringResult<LoadedKey>
where
    S: SettingsStore + ?Sized,
{
    if store.exists_setting(name)? {
        let hex_wrapped = store.select_string_setting(name)?;
        let key = unwrap_persisted(root, name, &hex_wrapped)?;
        info!(setting = name, "recovered wrapped key");
        return Ok(LoadedKey { key, hex_wrapped });
    }

    let key = aead::generate_key()?;
    let hex_wrapped = crypt_key_to_node_hex_key(root, &key)?;

    match store.save_string_setting_if_absent(name, &hex_wrapped) {
        Ok(None) => {
            info!(setting = name, "generated and persisted new key");
            Ok(LoadedKey { key, hex_wrapped })
        }
        Ok(Some(winner)) => {
            warn!(
                setting = name,
                "another node persisted this key first; discarding ours and adopting theirs"
            );
            let key = unwrap_persisted(root, name, &winner)?;
            Ok(LoadedKey {
                key,
                hex_wrapped: winner,
            })
        }
        Err(err) => {
            // No retry. The key still works for this run; the next start
            // will generate a different one unless the store comes back.
            warn!(
                setting = name,
                error = %err,
                "failed to persist generated key; it is held in memory for this run only"
            );
            Ok(LoadedKey { key, hex_wrapped })
        }
    }
}

fn unwrap_persisted(
    root: &RootKey,
    name: &'static str,
    hex_wrapped: &str,
) -> KeyringResult<SymmetricKey> {
    node_hex_key_to_crypt_key(root, hex_wrapped).map_err(|err| {
        error!(
            setting = name,
            error = %err,
            "persisted key failed to unwrap; the setting is corrupt or the root key changed"
        );
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::{MemorySettingsStore, StoreResult};

    fn root() -> RootKey {
        RootKey::from_bytes([0x42; 32])
    }

    /// Reads work, every write fails.
    struct ReadOnlyStore(MemorySettingsStore);

    impl SettingsStore for ReadOnlyStore {
        fn exists_setting(&self, name: &str) -> StoreResult<bool> {
            self.0.exists_setting(name)
        }

        fn select_string_setting(&self, name: &str) -> StoreResult<String> {
            self.0.select_string_setting(name)
        }

        fn save_string_setting(&self, _name: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("read-only".to_string()))
        }

        fn save_string_setting_if_absent(
            &self,
            _name: &str,
            _value: &str,
        ) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("read-only".to_string()))
        }
    }

    /// Claims nothing exists, then reports a winner on conditional insert.
    /// Simulates losing the first-bootstrap race to another node.
    struct RacingStore {
        winner: String,
    }

    impl SettingsStore for RacingStore {
        fn exists_setting(&self, _name: &str) -> StoreResult<bool> {
            Ok(false)
        }

        fn select_string_setting(&self, name: &str) -> StoreResult<String> {
            Err(StoreError::NotFound(name.to_string()))
        }

        fn save_string_setting(&self, _name: &str, _value: &str) -> StoreResult<()> {
            Ok(())
        }

        fn save_string_setting_if_absent(
            &self,
            _name: &str,
            _value: &str,
        ) -> StoreResult<Option<String>> {
            Ok(Some(self.winner.clone()))
        }
    }

    #[test]
    fn test_new_hierarchy_is_unbootstrapped() {
        let hierarchy = KeyHierarchy::new(root());
        assert!(!hierarchy.is_ready());
        assert!(hierarchy.hex_encrypted_nodes_key().is_none());
        assert!(matches!(
            hierarchy.instance_key(),
            Err(KeyringError::KeyNotLoaded("instance_key"))
        ));
        assert!(matches!(
            hierarchy.nodes_key(),
            Err(KeyringError::KeyNotLoaded("nodes_key"))
        ));
    }

    #[test]
    fn test_instance_slot_requires_bootstrap() {
        let hierarchy = KeyHierarchy::new(root());
        assert!(matches!(
            hierarchy.encrypt(b"data", KeySlot::Instance),
            Err(KeyringError::KeyNotLoaded(_))
        ));
        // The root slot is usable from the start.
        let sealed = hierarchy.encrypt(b"data", KeySlot::Root).unwrap();
        assert_eq!(hierarchy.decrypt(&sealed, KeySlot::Root).unwrap(), b"data");
    }

    #[test]
    fn test_first_load_persists_wrapped_instance_key() {
        let store = MemorySettingsStore::new();
        let mut hierarchy = KeyHierarchy::new(root());
        hierarchy.load_instance_key(&store).unwrap();

        let persisted = store.select_string_setting(INSTANCE_KEY_SETTING).unwrap();
        let raw = hex::decode(&persisted).unwrap();
        assert_eq!(raw.len(), crate::config::WRAPPED_KEY_LENGTH);

        // The persisted form is the wrapped key, not the key itself.
        let instance = hierarchy.instance_key().unwrap();
        assert_ne!(&raw[..], &instance.as_bytes()[..]);
        assert_eq!(&node_hex_key_to_crypt_key(&root(), &persisted).unwrap(), instance);
    }

    #[test]
    fn test_second_load_recovers_same_instance_key() {
        let store = MemorySettingsStore::new();

        let mut first = KeyHierarchy::new(root());
        first.load_instance_key(&store).unwrap();
        let persisted = store.select_string_setting(INSTANCE_KEY_SETTING).unwrap();

        let mut second = KeyHierarchy::new(root());
        second.load_instance_key(&store).unwrap();

        assert_eq!(first.instance_key().unwrap(), second.instance_key().unwrap());
        // Recovery must not rewrite the setting.
        assert_eq!(
            store.select_string_setting(INSTANCE_KEY_SETTING).unwrap(),
            persisted
        );
    }

    #[test]
    fn test_nodes_key_retains_wrapped_hex() {
        let store = MemorySettingsStore::new();
        let mut hierarchy = KeyHierarchy::new(root());
        hierarchy.load_nodes_key(&store).unwrap();

        let record = hierarchy.hex_encrypted_nodes_key().unwrap();
        assert_eq!(
            record.hex_encrypted_key(),
            store.select_string_setting(NODES_KEY_SETTING).unwrap()
        );
        assert_eq!(&record.unwrap_key(&root()).unwrap(), hierarchy.nodes_key().unwrap());
    }

    #[test]
    fn test_instance_and_nodes_keys_are_independent() {
        let store = MemorySettingsStore::new();
        let hierarchy = KeyHierarchy::bootstrap(root(), &store).unwrap();
        assert!(hierarchy.is_ready());
        assert_ne!(hierarchy.instance_key().unwrap(), hierarchy.nodes_key().unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_changed_root_key_fails_bootstrap() {
        let store = MemorySettingsStore::new();
        KeyHierarchy::bootstrap(root(), &store).unwrap();

        let other_root = RootKey::from_bytes([0x43; 32]);
        assert!(matches!(
            KeyHierarchy::bootstrap(other_root, &store),
            Err(KeyringError::Authentication)
        ));
    }

    #[test]
    fn test_corrupt_hex_setting_fails_bootstrap() {
        let store = MemorySettingsStore::new();
        store
            .save_string_setting(INSTANCE_KEY_SETTING, "this is not hex")
            .unwrap();

        let mut hierarchy = KeyHierarchy::new(root());
        assert!(matches!(
            hierarchy.load_instance_key(&store),
            Err(KeyringError::Format(_))
        ));
        assert!(hierarchy.instance_key().is_err());
    }

    #[test]
    fn test_store_write_failure_still_yields_key() {
        let store = ReadOnlyStore(MemorySettingsStore::new());
        let hierarchy = KeyHierarchy::bootstrap(root(), &store).unwrap();

        assert!(hierarchy.is_ready());
        assert!(hierarchy.hex_encrypted_nodes_key().is_some());
        assert!(!store.exists_setting(INSTANCE_KEY_SETTING).unwrap());

        let sealed = hierarchy.encrypt(b"payload", KeySlot::Instance).unwrap();
        assert_eq!(
            hierarchy.decrypt(&sealed, KeySlot::Instance).unwrap(),
            b"payload"
        );
    }

    #[test]
    fn test_losing_the_race_adopts_the_winner() {
        let winner_key = aead::generate_key().unwrap();
        let winner_hex = crypt_key_to_node_hex_key(&root(), &winner_key).unwrap();
        let store = RacingStore {
            winner: winner_hex.clone(),
        };

        let mut hierarchy = KeyHierarchy::new(root());
        hierarchy.load_nodes_key(&store).unwrap();

        assert_eq!(hierarchy.nodes_key().unwrap(), &winner_key);
        assert_eq!(
            hierarchy.hex_encrypted_nodes_key().unwrap().hex_encrypted_key(),
            winner_hex
        );
    }

    #[test]
    fn test_adopt_nodes_key_from_peer() {
        let leader_store = MemorySettingsStore::new();
        let leader = KeyHierarchy::bootstrap(root(), &leader_store).unwrap();
        let record = leader.hex_encrypted_nodes_key().unwrap();

        let replica_store = MemorySettingsStore::new();
        let mut replica = KeyHierarchy::new(root());
        replica.load_instance_key(&replica_store).unwrap();
        replica.adopt_nodes_key(&replica_store, &record).unwrap();

        assert_eq!(replica.nodes_key().unwrap(), leader.nodes_key().unwrap());
        assert_ne!(replica.instance_key().unwrap(), leader.instance_key().unwrap());
        assert_eq!(
            replica_store.select_string_setting(NODES_KEY_SETTING).unwrap(),
            record.hex_encrypted_key()
        );

        // A restarted replica now loads the shared key from its own store.
        let restarted = KeyHierarchy::bootstrap(root(), &replica_store).unwrap();
        assert_eq!(restarted.nodes_key().unwrap(), leader.nodes_key().unwrap());
    }

    #[test]
    fn test_adopt_rejects_record_from_foreign_root() {
        let foreign_store = MemorySettingsStore::new();
        let foreign =
            KeyHierarchy::bootstrap(RootKey::from_bytes([0x01; 32]), &foreign_store).unwrap();
        let record = foreign.hex_encrypted_nodes_key().unwrap();

        let store = MemorySettingsStore::new();
        let mut hierarchy = KeyHierarchy::new(root());
        assert!(matches!(
            hierarchy.adopt_nodes_key(&store, &record),
            Err(KeyringError::Authentication)
        ));
        assert!(hierarchy.nodes_key().is_err());
        assert!(!store.exists_setting(NODES_KEY_SETTING).unwrap());
    }

    #[test]
    fn test_adopt_refuses_to_replace_persisted_nodes_key() {
        let store = MemorySettingsStore::new();
        let mut node = KeyHierarchy::bootstrap(root(), &store).unwrap();
        let original = store.select_string_setting(NODES_KEY_SETTING).unwrap();
        let sealed = aead::encrypt(node.nodes_key().unwrap(), b"cluster data").unwrap();

        let peer = KeyHierarchy::bootstrap(root(), &MemorySettingsStore::new()).unwrap();
        let record = peer.hex_encrypted_nodes_key().unwrap();

        assert!(matches!(
            node.adopt_nodes_key(&store, &record),
            Err(KeyringError::Conflict("nodes_key"))
        ));
        assert_eq!(store.select_string_setting(NODES_KEY_SETTING).unwrap(), original);

        // A fresh hierarchy over the same store refuses too, and the old
        // data still opens after a restart.
        let mut fresh = KeyHierarchy::new(root());
        assert!(matches!(
            fresh.adopt_nodes_key(&store, &record),
            Err(KeyringError::Conflict(_))
        ));
        assert!(fresh.nodes_key().is_err());

        let restarted = KeyHierarchy::bootstrap(root(), &store).unwrap();
        assert_eq!(
            aead::decrypt(restarted.nodes_key().unwrap(), &sealed).unwrap(),
            b"cluster data"
        );
    }

    #[test]
    fn test_adopt_same_key_is_a_noop() {
        let store = MemorySettingsStore::new();
        let node = KeyHierarchy::bootstrap(root(), &store).unwrap();
        let persisted = store.select_string_setting(NODES_KEY_SETTING).unwrap();

        // Same key, fresh nonce: a different hex string for the same key.
        let rewrapped = NodesKeyRecord::seal(&root(), node.nodes_key().unwrap()).unwrap();
        assert_ne!(rewrapped.hex_encrypted_key(), persisted);

        let mut fresh = KeyHierarchy::new(root());
        fresh.adopt_nodes_key(&store, &rewrapped).unwrap();

        assert_eq!(fresh.nodes_key().unwrap(), node.nodes_key().unwrap());
        assert_eq!(store.select_string_setting(NODES_KEY_SETTING).unwrap(), persisted);
        assert_eq!(
            fresh.hex_encrypted_nodes_key().unwrap().hex_encrypted_key(),
            persisted
        );
    }

    #[test]
    fn test_hierarchy_transport_helpers_use_root() {
        let hierarchy = KeyHierarchy::new(root());
        let key = aead::generate_key().unwrap();
        let hex_key = hierarchy.crypt_key_to_node_hex_key(&key).unwrap();
        assert_eq!(hierarchy.node_hex_key_to_crypt_key(&hex_key).unwrap(), key);
        assert_eq!(node_hex_key_to_crypt_key(hierarchy.root_key(), &hex_key).unwrap(), key);
    }

    #[test]
    fn test_hierarchy_is_shareable_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let store = MemorySettingsStore::new();
        let hierarchy = Arc::new(KeyHierarchy::bootstrap(root(), &store).unwrap());

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let hierarchy = Arc::clone(&hierarchy);
                thread::spawn(move || {
                    let msg = [i; 64];
                    let sealed = hierarchy.encrypt(&msg, KeySlot::Instance).unwrap();
                    assert_eq!(hierarchy.decrypt(&sealed, KeySlot::Instance).unwrap(), msg);
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("reader thread should not panic");
        }
    }
}
