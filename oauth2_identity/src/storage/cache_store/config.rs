use std::sync::Arc;

use crate::storage::errors::StorageError;

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore};

/// Build and verify a cache store from a type name (`memory` or `redis`) and URL.
pub async fn connect_cache_store(
    store_type: &str,
    store_url: &str,
) -> Result<Arc<dyn CacheStore>, StorageError> {
    tracing::info!(store_type, "Initializing cache store");

    let store: Arc<dyn CacheStore> = match store_type {
        "memory" => Arc::new(InMemoryCacheStore::new()),
        "redis" => {
            let client = redis::Client::open(store_url).map_err(|e| {
                tracing::error!("Failed to create Redis client: {}", e);
                StorageError::from(e)
            })?;
            Arc::new(RedisCacheStore::new(client))
        }
        t => return Err(StorageError::UnsupportedStoreType(t.to_string())),
    };

    store.init().await?;

    tracing::info!(store_type, "Connected to cache store");
    Ok(store)
}
