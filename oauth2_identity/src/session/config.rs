use std::env;

use crate::config::{env_parse, env_string};

use super::errors::SessionError;

const DEFAULT_COOKIE_NAME: &str = "__Host-SessionId";
const DEFAULT_MAX_AGE_SECS: u64 = 86400;
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Session lifetime in seconds
    pub max_age: u64,
    pub(super) secret: Vec<u8>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("cookie_name", &self.cookie_name)
            .field("max_age", &self.max_age)
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl SessionConfig {
    /// Defaults with the given HMAC key, which must be at least 32 bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, SessionError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::Config(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: DEFAULT_MAX_AGE_SECS,
            secret,
        })
    }

    /// Reads `SESSION_SECRET`, `SESSION_COOKIE_NAME` and `SESSION_COOKIE_MAX_AGE`.
    pub fn from_env() -> Result<Self, SessionError> {
        let secret = env::var("SESSION_SECRET")
            .map_err(|_| SessionError::Config("SESSION_SECRET must be set".to_string()))?;
        let mut config = Self::new(secret)?;
        config.cookie_name = env_string("SESSION_COOKIE_NAME", config.cookie_name);
        config.max_age = env_parse("SESSION_COOKIE_MAX_AGE", config.max_age);
        Ok(config)
    }
}
