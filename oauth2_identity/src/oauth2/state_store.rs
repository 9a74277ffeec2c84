use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::storage::{CacheData, CacheStore};
use crate::utils::token_prefix;

use super::errors::OAuth2Error;
use super::types::OAuthState;

const STATE_CACHE_PREFIX: &str = "oauth2_state";

/// Extra cache lifetime past `expires_at`, so a late callback is reported as
/// expired rather than unknown.
const STATE_GRACE_SECS: i64 = 300;

/// Short-lived store of single-use [`OAuthState`] records.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    async fn save(&self, state: &OAuthState) -> Result<(), OAuth2Error>;

    /// Read and delete in one step. Expired records are returned as-is; the
    /// caller checks `expires_at`.
    async fn take(&self, state: &str) -> Result<Option<OAuthState>, OAuth2Error>;

    /// Drop records past their retention. Returns how many were dropped.
    async fn purge_expired(&self) -> Result<usize, OAuth2Error>;
}

/// [`StateStore`] over any [`CacheStore`] backend.
pub struct CacheStateStore {
    cache: Arc<dyn CacheStore>,
}

impl CacheStateStore {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl StateStore for CacheStateStore {
    async fn save(&self, state: &OAuthState) -> Result<(), OAuth2Error> {
        let remaining = (state.expires_at - Utc::now()).num_seconds().max(0);
        let ttl = (remaining + STATE_GRACE_SECS) as u64;

        let data = CacheData::try_from(state)?;
        self.cache
            .put_with_ttl(STATE_CACHE_PREFIX, &state.state, data, ttl)
            .await?;

        tracing::debug!(
            provider = %state.provider,
            state = token_prefix(&state.state),
            ttl,
            "Stored authorization state"
        );
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<OAuthState>, OAuth2Error> {
        match self.cache.take(STATE_CACHE_PREFIX, state).await? {
            Some(data) => Ok(Some(OAuthState::try_from(data)?)),
            None => Ok(None),
        }
    }

    async fn purge_expired(&self) -> Result<usize, OAuth2Error> {
        Ok(self.cache.purge_expired().await?)
    }
}
