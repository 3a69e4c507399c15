//! In-memory store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;

/// Process-local key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn poisoned<T>(_: T) -> AppError {
        AppError::store("memory store lock poisoned")
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        Ok(entries.keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(Self::poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(Self::poisoned)?;
        Ok(entries.remove(key).is_some())
    }
}
