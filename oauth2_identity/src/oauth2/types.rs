use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::STATE_TTL_SECS;
use crate::storage::CacheData;

use super::errors::OAuth2Error;

/// A single-use authorization attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthState {
    pub state: String,
    pub provider: String,
    pub redirect_uri: String,
    pub code_verifier: String,
    pub nonce: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set when the attempt links a provider account to this local user
    /// instead of logging in.
    pub link_user_id: Option<String>,
}

impl OAuthState {
    pub fn new(
        state: String,
        provider: &str,
        redirect_uri: String,
        code_verifier: String,
        nonce: String,
        link_user_id: Option<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            state,
            provider: provider.to_string(),
            redirect_uri,
            code_verifier,
            nonce,
            created_at,
            expires_at: created_at + Duration::seconds(STATE_TTL_SECS as i64),
            link_user_id,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_link(&self) -> bool {
        self.link_user_id.is_some()
    }
}

impl TryFrom<&OAuthState> for CacheData {
    type Error = OAuth2Error;

    fn try_from(state: &OAuthState) -> Result<Self, Self::Error> {
        Ok(Self {
            value: serde_json::to_string(state)?,
        })
    }
}

impl TryFrom<CacheData> for OAuthState {
    type Error = OAuth2Error;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        Ok(serde_json::from_str(&data.value)?)
    }
}

/// Parameters handed to a provider when building its authorization URL.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    pub redirect_uri: &'a str,
    pub state: &'a str,
    pub code_challenge: &'a str,
    pub nonce: &'a str,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: Option<i64>,
    pub id_token: Option<String>,
}

impl ProviderTokens {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| now + Duration::seconds(secs))
    }
}

/// Provider user info normalized to the fields the flow needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderProfile {
    /// Stable subject id, never the email
    pub provider_user_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub raw: serde_json::Value,
}

impl ProviderProfile {
    /// Email usable for account matching: present, non-empty and verified.
    pub fn verified_email(&self) -> Option<&str> {
        if !self.email_verified {
            return None;
        }
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }
}

/// Claims of a verified OIDC ID token that the flow checks.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IdTokenClaims {
    pub sub: String,
    pub iss: Option<String>,
    pub nonce: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub exp: i64,
}
