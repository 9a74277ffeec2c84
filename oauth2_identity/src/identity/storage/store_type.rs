use async_trait::async_trait;
use std::sync::Arc;

use crate::identity::{
    errors::IdentityError,
    types::{Identity, RemoveOutcome},
};
use crate::storage::DataStore;

use super::postgres::*;
use super::sqlite::*;

/// Durable `(provider, provider_user_id) -> user` bindings.
///
/// Implementations enforce uniqueness of `(provider, provider_user_id)`:
/// a conflicting [`insert`](IdentityStore::insert) fails with
/// [`IdentityError::AlreadyExists`].
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    async fn init(&self) -> Result<(), IdentityError>;

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<Identity>, IdentityError>;

    /// Identity of `user_id` at `provider`, if linked.
    async fn get_for_user(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<Identity>, IdentityError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Identity>, IdentityError>;

    async fn insert(&self, identity: Identity) -> Result<Identity, IdentityError>;

    /// Overwrite profile and token columns of an existing row, matched by id.
    async fn update_login(&self, identity: Identity) -> Result<Identity, IdentityError>;

    /// Remove the `provider` identities of `user_id`. With `keep_last`, the
    /// removal is refused when it would leave the user no identity at all.
    /// Counting and deleting happen atomically.
    async fn remove_for_user(
        &self,
        user_id: &str,
        provider: &str,
        keep_last: bool,
    ) -> Result<RemoveOutcome, IdentityError>;
}

/// [`IdentityStore`] over the SQLite or PostgreSQL pool of a [`DataStore`].
pub struct SqlIdentityStore {
    store: Arc<dyn DataStore>,
    table: String,
}

impl SqlIdentityStore {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        let table = format!("{}oauth2_identities", store.table_prefix());
        Self { store, table }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }
}

fn unsupported() -> IdentityError {
    IdentityError::Storage("Unsupported database type".to_string())
}

#[async_trait]
impl IdentityStore for SqlIdentityStore {
    async fn init(&self) -> Result<(), IdentityError> {
        match (self.store.as_sqlite(), self.store.as_postgres()) {
            (Some(pool), _) => create_tables_sqlite(pool, &self.table).await,
            (_, Some(pool)) => create_tables_postgres(pool, &self.table).await,
            _ => Err(unsupported()),
        }
    }

    #[tracing::instrument(skip(self, provider_user_id), fields(provider = %provider))]
    async fn get_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            get_by_provider_sqlite(pool, &self.table, provider, provider_user_id).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_by_provider_postgres(pool, &self.table, provider, provider_user_id).await
        } else {
            Err(unsupported())
        };

        match &result {
            Ok(found) => tracing::debug!(found = found.is_some(), "Identity lookup completed"),
            Err(e) => tracing::error!(error = %e, "Identity lookup failed"),
        }
        result
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id, provider = %provider))]
    async fn get_for_user(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        if let Some(pool) = self.store.as_sqlite() {
            get_for_user_sqlite(pool, &self.table, user_id, provider).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_for_user_postgres(pool, &self.table, user_id, provider).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Identity>, IdentityError> {
        if let Some(pool) = self.store.as_sqlite() {
            list_for_user_sqlite(pool, &self.table, user_id).await
        } else if let Some(pool) = self.store.as_postgres() {
            list_for_user_postgres(pool, &self.table, user_id).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id, provider = %identity.provider))]
    async fn insert(&self, identity: Identity) -> Result<Identity, IdentityError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            insert_identity_sqlite(pool, &self.table, identity).await
        } else if let Some(pool) = self.store.as_postgres() {
            insert_identity_postgres(pool, &self.table, identity).await
        } else {
            Err(unsupported())
        };

        match &result {
            Ok(_) => tracing::info!("Identity created"),
            Err(IdentityError::AlreadyExists(_)) => {
                tracing::warn!("Identity already bound, insert rejected")
            }
            Err(e) => tracing::error!(error = %e, "Identity creation failed"),
        }
        result
    }

    #[tracing::instrument(skip(self, identity), fields(identity_id = %identity.id))]
    async fn update_login(&self, identity: Identity) -> Result<Identity, IdentityError> {
        if let Some(pool) = self.store.as_sqlite() {
            update_login_sqlite(pool, &self.table, identity).await
        } else if let Some(pool) = self.store.as_postgres() {
            update_login_postgres(pool, &self.table, identity).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id, provider = %provider))]
    async fn remove_for_user(
        &self,
        user_id: &str,
        provider: &str,
        keep_last: bool,
    ) -> Result<RemoveOutcome, IdentityError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            remove_for_user_sqlite(pool, &self.table, user_id, provider, keep_last).await
        } else if let Some(pool) = self.store.as_postgres() {
            remove_for_user_postgres(pool, &self.table, user_id, provider, keep_last).await
        } else {
            Err(unsupported())
        };

        if let Ok(outcome) = &result {
            tracing::debug!(?outcome, "Identity removal completed");
        }
        result
    }
}
