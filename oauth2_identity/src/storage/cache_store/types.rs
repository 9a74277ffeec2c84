use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

pub(super) struct MemoryEntry {
    pub(super) data: CacheData,
    pub(super) expires_at: Instant,
}

/// Process-local cache. Entries are hidden once their TTL has passed and
/// physically dropped by [`CacheStore::purge_expired`].
pub struct InMemoryCacheStore {
    pub(super) entry: Mutex<HashMap<String, MemoryEntry>>,
}

/// Redis-backed cache. Expiry is delegated to Redis.
pub struct RedisCacheStore {
    pub(super) client: redis::Client,
}

#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError>;

    /// Put a value into the store with a TTL in seconds.
    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError>;

    /// Atomically read and delete a value. Of two concurrent callers for the
    /// same key at most one observes `Some`.
    async fn take(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError>;

    /// Drop entries whose TTL has passed. Returns the number of dropped entries.
    async fn purge_expired(&self) -> Result<usize, StorageError>;
}
