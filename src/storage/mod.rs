//! Key-value store abstractions for ad persistence.
//!
//! Records live under string keys carrying a common prefix (`ad_` by
//! default); values are JSON-serialized [`AdRecord`](crate::models::AdRecord)s.
//!
//! ## Backends
//!
//! ```text
//! LocalStore   {dir}/ad_1718000000000.json   # one file per key
//! MemoryStore  BTreeMap<String, String>      # embedding and tests
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Trait for string key-value backends.
///
/// Enumeration order is sorted by key so scans are deterministic.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// List every key in the store.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Read a value, returning `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Whether a key is present.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// List the keys starting with `prefix`.
pub async fn prefixed_keys(store: &dyn KeyValueStore, prefix: &str) -> Result<Vec<String>> {
    Ok(store
        .keys()
        .await?
        .into_iter()
        .filter(|k| k.starts_with(prefix))
        .collect())
}
