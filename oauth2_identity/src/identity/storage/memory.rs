use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::identity::{
    errors::IdentityError,
    types::{Identity, RemoveOutcome},
};

use super::store_type::IdentityStore;

/// Process-local [`IdentityStore`]. One lock guards all rows, which makes
/// the uniqueness check and the unlink guard atomic.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: Mutex<HashMap<String, Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.identities.lock().await.len()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn init(&self) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        Ok(self
            .identities
            .lock()
            .await
            .values()
            .find(|i| i.provider == provider && i.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn get_for_user(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        Ok(self
            .identities
            .lock()
            .await
            .values()
            .filter(|i| i.user_id == user_id && i.provider == provider)
            .min_by_key(|i| i.created_at)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Identity>, IdentityError> {
        let mut found: Vec<Identity> = self
            .identities
            .lock()
            .await
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|i| i.created_at);
        Ok(found)
    }

    async fn insert(&self, identity: Identity) -> Result<Identity, IdentityError> {
        let mut identities = self.identities.lock().await;
        if identities.values().any(|i| {
            i.provider == identity.provider && i.provider_user_id == identity.provider_user_id
        }) {
            return Err(IdentityError::AlreadyExists(format!(
                "{}/{}",
                identity.provider, identity.provider_user_id
            )));
        }
        identities.insert(identity.id.clone(), identity.clone());
        Ok(identity)
    }

    async fn update_login(&self, identity: Identity) -> Result<Identity, IdentityError> {
        let mut identities = self.identities.lock().await;
        let existing = identities
            .get_mut(&identity.id)
            .ok_or(IdentityError::NotFound)?;
        *existing = Identity {
            id: existing.id.clone(),
            user_id: existing.user_id.clone(),
            provider: existing.provider.clone(),
            provider_user_id: existing.provider_user_id.clone(),
            created_at: existing.created_at,
            ..identity
        };
        Ok(existing.clone())
    }

    async fn remove_for_user(
        &self,
        user_id: &str,
        provider: &str,
        keep_last: bool,
    ) -> Result<RemoveOutcome, IdentityError> {
        let mut identities = self.identities.lock().await;
        let owned = identities.values().filter(|i| i.user_id == user_id).count();
        let matching = identities
            .values()
            .filter(|i| i.user_id == user_id && i.provider == provider)
            .count();

        if matching == 0 {
            return Ok(RemoveOutcome::NotFound);
        }
        if keep_last && matching == owned {
            return Ok(RemoveOutcome::WouldOrphan);
        }
        identities.retain(|_, i| !(i.user_id == user_id && i.provider == provider));
        Ok(RemoveOutcome::Removed(matching as u64))
    }
}
