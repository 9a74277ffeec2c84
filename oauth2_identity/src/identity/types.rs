use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::oauth2::{ProviderProfile, ProviderTokens};

/// Binding of one provider account to one local user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Identity {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    /// Provider's stable subject id
    pub provider_user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing, default)]
    pub access_token: String,
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    #[sqlx(json)]
    pub raw_profile: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(
        user_id: &str,
        provider: &str,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            provider: provider.to_string(),
            provider_user_id: profile.provider_user_id.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            avatar_url: profile.avatar_url.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            token_expires_at: tokens.expires_at(now),
            raw_profile: profile.raw.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this identity carrying the tokens and profile of a fresh login.
    /// A refresh token is kept when the provider did not issue a new one.
    pub fn refreshed(&self, profile: &ProviderProfile, tokens: &ProviderTokens) -> Self {
        let now = Utc::now();
        Self {
            email: profile.email.clone(),
            name: profile.name.clone(),
            avatar_url: profile.avatar_url.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens
                .refresh_token
                .clone()
                .or_else(|| self.refresh_token.clone()),
            token_expires_at: tokens.expires_at(now),
            raw_profile: profile.raw.clone(),
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Token-free view of an [`Identity`], safe to return to the account owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentitySummary {
    pub provider: String,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for IdentitySummary {
    fn from(identity: &Identity) -> Self {
        Self {
            provider: identity.provider.clone(),
            provider_user_id: identity.provider_user_id.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            avatar_url: identity.avatar_url.clone(),
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

/// Result of [`IdentityStore::remove_for_user`](super::IdentityStore::remove_for_user).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Number of rows removed
    Removed(u64),
    NotFound,
    /// Removal would leave the user without any identity
    WouldOrphan,
}
