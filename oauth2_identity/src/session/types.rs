use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::userdb::User;

use super::errors::SessionError;

/// Role given to sessions established through a provider login.
pub const DEFAULT_ROLE: &str = "user";

/// Claims carried by a session credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Local user id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed, time-boxed session token.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionCredential {
    /// Seconds until expiry, never negative.
    pub fn max_age(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Mints and checks session credentials for local users.
#[async_trait]
pub trait SessionIssuer: Send + Sync + 'static {
    /// Name of the cookie that carries the credential.
    fn cookie_name(&self) -> &str;

    async fn issue(&self, user: &User, role: &str) -> Result<SessionCredential, SessionError>;

    async fn verify(&self, token: &str) -> Result<SessionClaims, SessionError>;
}
