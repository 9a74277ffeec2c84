//! Provider settings read from `OAUTH2_PROVIDERS` and `OAUTH2_<NAME>_*`

use std::env;

use crate::config::env_string;
use crate::oauth2::errors::ProviderError;

/// Names of the userinfo fields that feed [`ProviderProfile`](crate::oauth2::ProviderProfile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFieldMap {
    pub subject: String,
    pub email: String,
    pub email_verified: String,
    pub name: String,
    pub avatar: String,
}

impl Default for ProfileFieldMap {
    fn default() -> Self {
        Self {
            subject: "sub".to_string(),
            email: "email".to_string(),
            email_verified: "email_verified".to_string(),
            name: "name".to_string(),
            avatar: "picture".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OidcProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: String,
    /// Enables ID token verification when set
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub fields: ProfileFieldMap,
}

impl OidcProviderConfig {
    pub fn from_env(name: &str) -> Result<Self, ProviderError> {
        let key = |suffix: &str| format!("OAUTH2_{}_{suffix}", env_key(name));
        let required = |suffix: &str| {
            let var = key(suffix);
            env::var(&var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ProviderError::Config(format!("{var} must be set")))
        };
        let optional = |suffix: &str| env::var(key(suffix)).ok().filter(|v| !v.trim().is_empty());

        let defaults = ProfileFieldMap::default();
        let config = Self {
            name: name.to_string(),
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            auth_url: required("AUTH_URL")?,
            token_url: required("TOKEN_URL")?,
            userinfo_url: required("USERINFO_URL")?,
            scopes: env_string(&key("SCOPES"), "openid email profile".to_string()),
            jwks_url: optional("JWKS_URL"),
            issuer: optional("ISSUER"),
            fields: ProfileFieldMap {
                subject: env_string(&key("SUBJECT_FIELD"), defaults.subject),
                email: env_string(&key("EMAIL_FIELD"), defaults.email),
                email_verified: env_string(&key("EMAIL_VERIFIED_FIELD"), defaults.email_verified),
                name: env_string(&key("NAME_FIELD"), defaults.name),
                avatar: env_string(&key("AVATAR_FIELD"), defaults.avatar),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if !is_valid_provider_name(&self.name) {
            return Err(ProviderError::Config(format!(
                "invalid provider name: {}",
                self.name
            )));
        }
        for (label, value) in [
            ("AUTH_URL", &self.auth_url),
            ("TOKEN_URL", &self.token_url),
            ("USERINFO_URL", &self.userinfo_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ProviderError::Config(format!("{label} is not a valid URL: {e}")))?;
        }
        Ok(())
    }
}

/// Provider names appear in URL paths and table rows.
pub(crate) fn is_valid_provider_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub(super) fn configured_provider_names() -> Vec<String> {
    env::var("OAUTH2_PROVIDERS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_key(name: &str) -> String {
    name.to_ascii_uppercase().replace('-', "_")
}
