use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheStore, InMemoryCacheStore, MemoryEntry};

const CACHE_PREFIX: &str = "cache";

impl InMemoryCacheStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory generic cache store");
        Self {
            entry: Mutex::new(HashMap::new()),
        }
    }

    fn make_key(prefix: &str, key: &str) -> String {
        format!("{CACHE_PREFIX}:{prefix}:{key}")
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        let entry = MemoryEntry {
            data: value,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        };
        self.entry.lock().await.insert(key, entry);
        Ok(())
    }

    async fn take(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let key = Self::make_key(prefix, key);
        let now = Instant::now();
        // Removal happens under the same lock as the read.
        Ok(self
            .entry
            .lock()
            .await
            .remove(&key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.data))
    }

    async fn purge_expired(&self) -> Result<usize, StorageError> {
        let now = Instant::now();
        let mut entries = self.entry.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}
