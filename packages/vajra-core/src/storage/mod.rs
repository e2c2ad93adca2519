//! # Storage Module
//!
//! Local persistence for the signed-in identity and client settings.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   KeyValueStore (trait)                                                │
//! │   ├── MemoryStore   in-process map, tests and short-lived sessions     │
//! │   └── FileStore     one JSON object on disk, atomic replace on write   │
//! │                                                                         │
//! │   Records                                                              │
//! │   ├── vajra.identity            { handle, publicKey, wrapper }         │
//! │   └── vajra.settings.server_url custom relay URL                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! Only the password wrapper is ever written. [`save_identity`] takes an
//! [`Identity`] and copies its wrapper, never its in-memory private key, so
//! there is no way to persist a key in the clear through this module.

mod file_store;
mod secure_store;

pub use file_store::FileStore;
pub use secure_store::{keys, MemoryStore};

use serde::{Deserialize, Serialize};

use crate::crypto::ExportedPublicKey;
use crate::error::{Error, Result};
use crate::identity::{Identity, PasswordWrapper};

/// String key/value persistence
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool>;

    /// Check if a key exists
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// The persisted form of an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredIdentity {
    /// User handle
    pub handle: String,
    /// Public key in transport form
    pub public_key: ExportedPublicKey,
    /// Password-wrapped private key
    pub wrapper: PasswordWrapper,
}

impl StoredIdentity {
    /// Rebuild a wrapped [`Identity`]
    pub fn into_identity(self) -> Result<Identity> {
        Identity::from_parts(&self.handle, self.public_key, self.wrapper)
    }
}

impl From<&Identity> for StoredIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            handle: identity.handle().to_string(),
            public_key: identity.public_key().clone(),
            wrapper: identity.wrapper().clone(),
        }
    }
}

/// Persist the identity's public parts and wrapper
pub fn save_identity(store: &dyn KeyValueStore, identity: &Identity) -> Result<()> {
    let record = serde_json::to_string(&StoredIdentity::from(identity))?;
    store.set(keys::IDENTITY, &record)?;
    tracing::debug!(handle = identity.handle(), "Identity saved");
    Ok(())
}

/// Load the stored identity, always in the wrapped state
pub fn load_identity(store: &dyn KeyValueStore) -> Result<Option<Identity>> {
    let Some(record) = store.get(keys::IDENTITY)? else {
        return Ok(None);
    };
    let stored: StoredIdentity = serde_json::from_str(&record)
        .map_err(|e| Error::StorageCorrupted(format!("identity record: {}", e)))?;
    stored.into_identity().map(Some)
}

/// Forget the stored identity
pub fn clear_identity(store: &dyn KeyValueStore) -> Result<bool> {
    store.remove(keys::IDENTITY)
}

/// Persist a custom relay URL
pub fn save_server_url(store: &dyn KeyValueStore, url: &str) -> Result<()> {
    store.set(keys::SERVER_URL, url)
}

/// The stored relay URL, if one was set
pub fn load_server_url(store: &dyn KeyValueStore) -> Result<Option<String>> {
    store.get(keys::SERVER_URL)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityState;
    use crate::testing::fast_vault;

    #[test]
    fn test_identity_round_trip() {
        let store = MemoryStore::new();
        assert!(load_identity(&store).unwrap().is_none());

        let vault = fast_vault();
        let (identity, _) = Identity::register(&vault, "alice", "p@ss1").unwrap();
        save_identity(&store, &identity).unwrap();

        let mut loaded = load_identity(&store).unwrap().unwrap();
        assert_eq!(loaded.handle(), "alice");
        assert_eq!(loaded.state(), IdentityState::Wrapped);
        assert_eq!(loaded.wrapper(), identity.wrapper());
        loaded.unlock(&vault, "p@ss1").unwrap();

        assert!(clear_identity(&store).unwrap());
        assert!(load_identity(&store).unwrap().is_none());
    }

    #[test]
    fn test_stored_record_has_no_plain_key() {
        let store = MemoryStore::new();
        let vault = fast_vault();
        let (identity, _) = Identity::register(&vault, "alice", "p@ss1").unwrap();
        save_identity(&store, &identity).unwrap();

        let raw = store.get(keys::IDENTITY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let fields: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(fields, vec!["handle", "publicKey", "wrapper"]);
    }

    #[test]
    fn test_corrupted_record() {
        let store = MemoryStore::new();
        store.set(keys::IDENTITY, "{not json").unwrap();
        assert!(matches!(
            load_identity(&store),
            Err(Error::StorageCorrupted(_))
        ));
    }

    #[test]
    fn test_server_url() {
        let store = MemoryStore::new();
        assert_eq!(load_server_url(&store).unwrap(), None);
        save_server_url(&store, "https://relay.example").unwrap();
        assert_eq!(
            load_server_url(&store).unwrap().as_deref(),
            Some("https://relay.example")
        );
    }
}
