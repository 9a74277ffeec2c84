//! Database connection setup

use std::{str::FromStr, sync::Arc};

use crate::storage::errors::StorageError;

use super::types::{DataStore, PostgresDataStore, SqliteDataStore};

/// Default table prefix when `DB_TABLE_PREFIX` is not set.
pub const DEFAULT_TABLE_PREFIX: &str = "o2i_";

/// Open a lazily connected pool for `store_type` (`sqlite` or `postgres`).
pub async fn connect_data_store(
    store_type: &str,
    store_url: &str,
    table_prefix: Option<&str>,
) -> Result<Arc<dyn DataStore>, StorageError> {
    let table_prefix = table_prefix.unwrap_or(DEFAULT_TABLE_PREFIX);
    tracing::info!(store_type, table_prefix, "Initializing data store");

    let store: Arc<dyn DataStore> = match store_type {
        "sqlite" => {
            let opts = sqlx::sqlite::SqliteConnectOptions::from_str(store_url)?
                .create_if_missing(true);
            let mut pool_opts = sqlx::sqlite::SqlitePoolOptions::new();
            if store_url.contains(":memory:") {
                // Every connection to `:memory:` opens a separate database
                pool_opts = pool_opts
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None);
            }
            let pool = pool_opts.connect_with(opts).await?;
            Arc::new(SqliteDataStore::new(pool, table_prefix))
        }
        "postgres" => {
            let pool = sqlx::PgPool::connect_lazy(store_url)?;
            Arc::new(PostgresDataStore::new(pool, table_prefix))
        }
        t => return Err(StorageError::UnsupportedStoreType(t.to_string())),
    };

    tracing::info!(store_type, "Connected to data store");
    Ok(store)
}
