//! Entry storage backends.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entry::CacheEntry;
use crate::error::CacheResult;

/// Storage for cache entries.
///
/// Backends only store entries; revalidation and fetch coalescing live
/// in `CacheStore`, so a durable backend can be substituted without
/// touching the singleflight protocol.
#[async_trait]
pub trait CacheBackend<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Get the entry stored under `key`.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry<V>>>;

    /// Store an entry, replacing any previous one for the same key.
    async fn set(&self, entry: CacheEntry<V>) -> CacheResult<()>;

    /// Delete an entry. Returns whether one existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every entry.
    async fn clear(&self) -> CacheResult<()>;

    /// Number of stored entries.
    async fn len(&self) -> CacheResult<usize>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// In-memory backend.
///
/// Fast but non-persistent: entries are lost on restart. With a cap set,
/// inserting a new key at capacity evicts the entry fetched longest ago.
pub struct MemoryBackend<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    max_entries: Option<usize>,
}

impl<V> MemoryBackend<V> {
    /// Create an unbounded memory backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: None,
        }
    }

    /// Cap the number of stored entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max.max(1));
        self
    }
}

impl<V> Default for MemoryBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheBackend<V> for MemoryBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry<V>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, entry: CacheEntry<V>) -> CacheResult<()> {
        let mut entries = self.entries.write().await;

        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(&entry.key) {
                let oldest = entries
                    .values()
                    .min_by_key(|e| e.fetched_at)
                    .map(|e| e.key.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(evicted = %oldest, "cache at capacity");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.read().await.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
