use chrono::Utc;
use http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::oauth2::{
    OAuthState, ProviderClient, ProviderError, ProviderProfile, ProviderTokens, RequestOrigin,
};
use crate::utils::token_prefix;

use super::controller::OAuthFlowController;
use super::errors::CoordinationError;
use super::types::{CallbackError, CallbackParams, FlowErrorCode, FlowRedirect, with_query};

impl OAuthFlowController {
    /// Handle the provider's redirect back.
    ///
    /// Malformed requests fail with [`CoordinationError::BadRequest`]. Every
    /// other outcome, success or failure, is a redirect.
    #[tracing::instrument(skip(self, params, headers), fields(provider = %provider))]
    pub async fn callback(
        &self,
        provider: &str,
        params: &CallbackParams,
        headers: &HeaderMap,
    ) -> Result<FlowRedirect, CoordinationError> {
        if let Some(error) = params.error.as_deref() {
            let code = FlowErrorCode::from_provider(error);
            tracing::warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or(""),
                "Provider reported an authorization error"
            );
            return Ok(FlowRedirect::to(with_query(
                &self.config.login_path,
                "error",
                code.as_str(),
            )));
        }

        let (Some(code), Some(state_token)) = (
            params.code.as_deref().filter(|c| !c.is_empty()),
            params.state.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(CoordinationError::BadRequest("missing code or state".to_string()).log());
        };

        let client = self.provider(provider).ok_or_else(|| {
            CoordinationError::BadRequest(format!("unknown provider: {provider}")).log()
        })?;

        let origin = RequestOrigin::from_headers(headers, &self.config.default_scheme)?;
        let callback_url = origin.callback_url(&self.config, provider);

        let state = match self.consume_state(provider, state_token).await {
            Ok(state) => state,
            Err(e) => return Ok(self.failure_redirect(&self.config.login_path, e)),
        };

        // From here on the state is spent; failures are terminal.
        let failure_path = if state.is_link() {
            self.config.settings_path.clone()
        } else {
            self.config.login_path.clone()
        };

        match self
            .complete(client.as_ref(), &state, code, &callback_url, headers)
            .await
        {
            Ok(redirect) => Ok(redirect),
            Err(e) => Ok(self.failure_redirect(&failure_path, e)),
        }
    }

    /// Atomically take the state, then check it. An expired or mismatched
    /// record is consumed all the same.
    async fn consume_state(
        &self,
        provider: &str,
        state_token: &str,
    ) -> Result<OAuthState, CallbackError> {
        let prefix = token_prefix(state_token);

        let state = self
            .states
            .take(state_token)
            .await
            .map_err(|e| CallbackError::new(FlowErrorCode::ServerError, e.to_string()))?
            .ok_or_else(|| {
                tracing::warn!(state = prefix, "Unknown or already used state token");
                CallbackError::new(FlowErrorCode::InvalidState, "state not found")
            })?;

        if state.is_expired_at(Utc::now()) {
            tracing::warn!(
                state = prefix,
                expired_at = %state.expires_at,
                "Expired state token presented"
            );
            return Err(CallbackError::new(
                FlowErrorCode::StateExpired,
                "state expired",
            ));
        }

        if state.provider != provider {
            return Err(CallbackError::new(
                FlowErrorCode::InvalidState,
                format!("state issued for provider {}", state.provider),
            ));
        }

        Ok(state)
    }

    async fn complete(
        &self,
        client: &dyn ProviderClient,
        state: &OAuthState,
        code: &str,
        callback_url: &str,
        headers: &HeaderMap,
    ) -> Result<FlowRedirect, CallbackError> {
        let provider = client.name();

        let tokens = client
            .exchange_code(code, &state.code_verifier, callback_url)
            .await
            .map_err(|e| {
                tracing::error!(provider, error = %e, "Authorization code exchange failed");
                match e {
                    ProviderError::TokenResponse(_) | ProviderError::IdToken(_) => {
                        CallbackError::new(FlowErrorCode::TokenError, e.to_string())
                    }
                    _ => CallbackError::new(FlowErrorCode::ExchangeFailed, e.to_string()),
                }
            })?;

        let profile = client.fetch_profile(&tokens).await.map_err(|e| {
            tracing::error!(provider, error = %e, "Profile fetch failed");
            CallbackError::new(FlowErrorCode::ProfileFailed, e.to_string())
        })?;

        verify_id_token(client, &tokens, &profile, &state.nonce).await?;

        match &state.link_user_id {
            Some(link_user_id) => {
                self.ensure_link_session(link_user_id, headers).await?;
                self.resolve_link(link_user_id, provider, &profile, &tokens)
                    .await?;
                tracing::info!(user_id = %link_user_id, "Linked provider identity");
                Ok(FlowRedirect::to(with_query(
                    &self.config.settings_path,
                    "linked",
                    provider,
                )))
            }
            None => {
                let user = self.resolve_login(provider, &profile, &tokens).await?;
                self.login_user(&user, &state.redirect_uri)
                    .await
                    .map_err(|e| CallbackError::new(FlowErrorCode::ServerError, e.to_string()))
            }
        }
    }

    /// A link callback must arrive in the session of the user who started it.
    async fn ensure_link_session(
        &self,
        link_user_id: &str,
        headers: &HeaderMap,
    ) -> Result<(), CallbackError> {
        let claims = self
            .session_claims(headers)
            .await
            .map_err(|e| CallbackError::new(FlowErrorCode::ServerError, e.to_string()))?;

        match claims {
            Some(claims) if claims.sub == link_user_id => Ok(()),
            _ => Err(CallbackError::new(
                FlowErrorCode::InvalidState,
                "link callback outside the initiating session",
            )),
        }
    }

    fn failure_redirect(&self, path: &str, error: CallbackError) -> FlowRedirect {
        if error.code.is_expected() {
            tracing::warn!(code = %error.code, detail = %error.detail, "Callback rejected");
        } else {
            tracing::error!(code = %error.code, detail = %error.detail, "Callback failed");
        }
        FlowRedirect::to(with_query(path, "error", error.code.as_str()))
    }
}

/// When the provider returned an ID token it can verify, its nonce must be
/// the one bound to this state and its subject the profile's subject.
async fn verify_id_token(
    client: &dyn ProviderClient,
    tokens: &ProviderTokens,
    profile: &ProviderProfile,
    expected_nonce: &str,
) -> Result<(), CallbackError> {
    let Some(id_token) = tokens.id_token.as_deref() else {
        return Ok(());
    };

    let claims = match client.verify_id_token(id_token).await {
        Ok(Some(claims)) => claims,
        Ok(None) => return Ok(()),
        Err(e) => {
            tracing::error!(provider = client.name(), error = %e, "ID token verification failed");
            return Err(CallbackError::new(FlowErrorCode::TokenError, e.to_string()));
        }
    };

    let nonce_matches = claims
        .nonce
        .as_deref()
        .map(|nonce| bool::from(nonce.as_bytes().ct_eq(expected_nonce.as_bytes())))
        .unwrap_or(false);
    if !nonce_matches {
        return Err(CallbackError::new(
            FlowErrorCode::TokenError,
            "ID token nonce mismatch",
        ));
    }

    if claims.sub != profile.provider_user_id {
        return Err(CallbackError::new(
            FlowErrorCode::TokenError,
            "ID token subject does not match profile",
        ));
    }

    Ok(())
}
