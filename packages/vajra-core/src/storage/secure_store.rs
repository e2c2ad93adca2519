//! In-memory key/value store and the fixed record keys.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::KeyValueStore;
use crate::error::Result;

/// Keys used for stored records
pub mod keys {
    /// The wrapped identity record
    pub const IDENTITY: &str = "vajra.identity";

    /// Custom relay URL
    pub const SERVER_URL: &str = "vajra.settings.server_url";
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    memory: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.memory.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.memory.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.memory.write().remove(key).is_some())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.memory.read().contains_key(key))
    }
}
