//! Generic OAuth2/OIDC provider over HTTP

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::oauth2::errors::ProviderError;
use crate::oauth2::pkce::CODE_CHALLENGE_METHOD;
use crate::oauth2::types::{AuthorizationRequest, IdTokenClaims, ProviderProfile, ProviderTokens};

use super::client::ProviderClient;
use super::config::{OidcProviderConfig, ProfileFieldMap};
use super::idtoken::IdTokenVerifier;

/// Token endpoint body. Some providers answer errors with HTTP 200, so the
/// OAuth error fields are read regardless of status.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    id_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct OidcProviderClient {
    config: OidcProviderConfig,
    http: reqwest::Client,
    verifier: Option<IdTokenVerifier>,
}

impl OidcProviderClient {
    pub fn new(config: OidcProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .user_agent(concat!("oauth2-identity/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {e}")))?;

        let verifier = config.jwks_url.clone().map(|jwks_url| {
            IdTokenVerifier::new(jwks_url, config.client_id.clone(), config.issuer.clone())
        });

        Ok(Self {
            config,
            http,
            verifier,
        })
    }
}

#[async_trait]
impl ProviderClient for OidcProviderClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn authorization_url(
        &self,
        request: &AuthorizationRequest<'_>,
    ) -> Result<String, ProviderError> {
        let url = url::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", request.redirect_uri),
                ("scope", self.config.scopes.as_str()),
                ("state", request.state),
                ("nonce", request.nonce),
                ("code_challenge", request.code_challenge),
                ("code_challenge_method", CODE_CHALLENGE_METHOD),
            ],
        )
        .map_err(|e| ProviderError::Config(format!("Invalid authorization URL: {e}")))?;
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .header(http::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_token_response(status, &body)
    }

    async fn fetch_profile(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderProfile, ProviderError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&tokens.access_token)
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Profile(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Profile(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Profile(format!("malformed userinfo response: {e}")))?;
        map_profile(&self.config.fields, raw)
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<Option<IdTokenClaims>, ProviderError> {
        match &self.verifier {
            Some(verifier) => Ok(Some(verifier.verify(&self.http, id_token).await?)),
            None => Ok(None),
        }
    }
}

fn parse_token_response(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<ProviderTokens, ProviderError> {
    let parsed: TokenEndpointResponse = serde_json::from_str(body).map_err(|_| {
        ProviderError::TokenResponse(format!("malformed token response (status {status})"))
    })?;

    if let Some(error) = parsed.error {
        tracing::debug!(
            error = %error,
            description = parsed.error_description.as_deref().unwrap_or(""),
            "Token endpoint returned an OAuth error"
        );
        return Err(ProviderError::TokenResponse(error));
    }
    if !status.is_success() {
        return Err(ProviderError::TokenResponse(status.to_string()));
    }

    let access_token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProviderError::TokenResponse("missing access_token".to_string()))?;

    Ok(ProviderTokens {
        access_token,
        token_type: parsed.token_type.unwrap_or_else(|| "Bearer".to_string()),
        refresh_token: parsed.refresh_token,
        expires_in: parsed.expires_in,
        id_token: parsed.id_token,
    })
}

fn map_profile(fields: &ProfileFieldMap, raw: Value) -> Result<ProviderProfile, ProviderError> {
    let provider_user_id = match raw.get(&fields.subject) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(ProviderError::Profile(format!(
                "missing subject field '{}'",
                fields.subject
            )));
        }
    };

    let string_field = |name: &str| {
        raw.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let email_verified = match raw.get(&fields.email_verified) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };

    Ok(ProviderProfile {
        provider_user_id,
        email: string_field(&fields.email),
        email_verified,
        name: string_field(&fields.name),
        avatar_url: string_field(&fields.avatar),
        raw,
    })
}
