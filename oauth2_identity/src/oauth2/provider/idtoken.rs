//! ID token verification against a provider JWKS

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::oauth2::errors::ProviderError;
use crate::oauth2::types::IdTokenClaims;

const JWKS_CACHE_EXPIRATION: Duration = Duration::from_secs(600);

const ALLOWED_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::PS256,
];

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Verifies ID tokens of one provider, caching its key set.
pub(super) struct IdTokenVerifier {
    jwks_url: String,
    audience: String,
    issuer: Option<String>,
    cache: RwLock<Option<CachedJwks>>,
}

impl IdTokenVerifier {
    pub(super) fn new(jwks_url: String, audience: String, issuer: Option<String>) -> Self {
        Self {
            jwks_url,
            audience,
            issuer,
            cache: RwLock::new(None),
        }
    }

    pub(super) async fn verify(
        &self,
        http: &reqwest::Client,
        id_token: &str,
    ) -> Result<IdTokenClaims, ProviderError> {
        let header = jsonwebtoken::decode_header(id_token)?;
        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(ProviderError::IdToken(format!(
                "unsupported algorithm: {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| ProviderError::IdToken("missing kid".to_string()))?;

        let key = match self.decoding_key(http, &kid, false).await? {
            Some(key) => key,
            // Keys rotate; refetch once before giving up
            None => self
                .decoding_key(http, &kid, true)
                .await?
                .ok_or_else(|| ProviderError::IdToken(format!("no matching key for kid {kid}")))?,
        };

        let validation = self.validation(header.alg);
        let data = jsonwebtoken::decode::<IdTokenClaims>(id_token, &key, &validation)?;
        Ok(data.claims)
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation.leeway = 2;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        validation
    }

    async fn decoding_key(
        &self,
        http: &reqwest::Client,
        kid: &str,
        force_refresh: bool,
    ) -> Result<Option<DecodingKey>, ProviderError> {
        if !force_refresh {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < JWKS_CACHE_EXPIRATION {
                    return key_for(&cached.jwks, kid);
                }
            }
        }

        tracing::debug!(jwks_url = %self.jwks_url, "Fetching JWKS");
        let jwks: JwkSet = http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let key = key_for(&jwks, kid);

        *self.cache.write().await = Some(CachedJwks {
            jwks,
            fetched_at: Instant::now(),
        });
        key
    }
}

fn key_for(jwks: &JwkSet, kid: &str) -> Result<Option<DecodingKey>, ProviderError> {
    jwks.find(kid)
        .map(DecodingKey::from_jwk)
        .transpose()
        .map_err(ProviderError::from)
}
