use dashmap::DashMap;

use forum_core::ports::{LocalStorage, StorageError};

use super::validate_key;

/// Volatile storage for tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryLocalStorage {
    items: DashMap<String, String>,
}

impl InMemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one item.
    pub fn with_item(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.items.insert(key.to_string(), value.to_string());
        storage
    }
}

impl LocalStorage for InMemoryLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.items.remove(key);
        Ok(())
    }
}
