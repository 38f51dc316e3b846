//! In-memory storage for tests and ephemeral (no-persistence) sessions.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::KvStorage;

#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl KvStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}
