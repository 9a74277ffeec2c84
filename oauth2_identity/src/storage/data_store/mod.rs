mod config;
mod types;

pub use config::{DEFAULT_TABLE_PREFIX, connect_data_store};
pub use types::{DataStore, PostgresDataStore, SqliteDataStore};
