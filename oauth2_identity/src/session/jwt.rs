use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::userdb::User;

use super::config::SessionConfig;
use super::errors::SessionError;
use super::types::{SessionClaims, SessionCredential, SessionIssuer};

/// HS256-signed JWT sessions. Stateless: logout only clears the cookie.
pub struct JwtSessionIssuer {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtSessionIssuer {
    pub fn new(config: SessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(&config.secret);
        let decoding_key = DecodingKey::from_secret(&config.secret);
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }
}

#[async_trait]
impl SessionIssuer for JwtSessionIssuer {
    fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn issue(&self, user: &User, role: &str) -> Result<SessionCredential, SessionError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.max_age as i64);
        let claims = SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Crypto(e.to_string()))?;

        tracing::debug!(role, "Issued session credential");
        Ok(SessionCredential { token, expires_at })
    }

    async fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
