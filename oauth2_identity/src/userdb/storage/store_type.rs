use async_trait::async_trait;
use std::sync::Arc;

use crate::storage::DataStore;
use crate::userdb::{errors::UserError, types::User};

use super::postgres::*;
use super::sqlite::*;

/// Local user accounts
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Create tables if needed
    async fn init(&self) -> Result<(), UserError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError>;

    /// Oldest user with this email, compared case-insensitively.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    async fn create_user(&self, user: User) -> Result<User, UserError>;

    /// Update email, name, password hash and status of an existing user.
    async fn update_user(&self, user: User) -> Result<User, UserError>;

    async fn delete_user(&self, id: &str) -> Result<(), UserError>;
}

/// [`UserStore`] over the SQLite or PostgreSQL pool of a [`DataStore`].
pub struct SqlUserStore {
    store: Arc<dyn DataStore>,
    table: String,
}

impl SqlUserStore {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        let table = format!("{}users", store.table_prefix());
        Self { store, table }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }
}

fn unsupported() -> UserError {
    UserError::Storage("Unsupported database type".to_string())
}

#[async_trait]
impl UserStore for SqlUserStore {
    async fn init(&self) -> Result<(), UserError> {
        match (self.store.as_sqlite(), self.store.as_postgres()) {
            (Some(pool), _) => create_tables_sqlite(pool, &self.table).await,
            (_, Some(pool)) => create_tables_postgres(pool, &self.table).await,
            _ => Err(unsupported()),
        }
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            get_user_sqlite(pool, &self.table, id).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_user_postgres(pool, &self.table, id).await
        } else {
            Err(unsupported())
        };

        match &result {
            Ok(user) => tracing::debug!(found = user.is_some(), "User lookup completed"),
            Err(e) => tracing::error!(error = %e, "User lookup failed"),
        }
        result
    }

    #[tracing::instrument(skip(self, email))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        if let Some(pool) = self.store.as_sqlite() {
            get_user_by_email_sqlite(pool, &self.table, email).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_user_by_email_postgres(pool, &self.table, email).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create_user(&self, user: User) -> Result<User, UserError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            insert_user_sqlite(pool, &self.table, user).await
        } else if let Some(pool) = self.store.as_postgres() {
            insert_user_postgres(pool, &self.table, user).await
        } else {
            Err(unsupported())
        };

        match &result {
            Ok(_) => tracing::info!("User created"),
            Err(e) => tracing::error!(error = %e, "User creation failed"),
        }
        result
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: User) -> Result<User, UserError> {
        if let Some(pool) = self.store.as_sqlite() {
            update_user_sqlite(pool, &self.table, user).await
        } else if let Some(pool) = self.store.as_postgres() {
            update_user_postgres(pool, &self.table, user).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn delete_user(&self, id: &str) -> Result<(), UserError> {
        if let Some(pool) = self.store.as_sqlite() {
            delete_user_sqlite(pool, &self.table, id).await
        } else if let Some(pool) = self.store.as_postgres() {
            delete_user_postgres(pool, &self.table, id).await
        } else {
            Err(unsupported())
        }
    }
}
