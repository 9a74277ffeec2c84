use http::HeaderMap;
use std::sync::Arc;

use crate::config::FlowConfig;
use crate::identity::{IdentityStore, IdentitySummary, RemoveOutcome};
use crate::oauth2::{
    AuthorizationRequest, OAuthState, ProviderClient, ProviderRegistry, RequestOrigin, StateStore,
    code_challenge_s256, generate_code_verifier, generate_nonce, generate_state_token,
    normalize_redirect, safe_redirect,
};
use crate::session::{
    DEFAULT_ROLE, SessionClaims, SessionIssuer, get_session_token_from_headers,
    logout_cookie_headers, session_cookie_headers,
};
use crate::userdb::{User, UserStore};
use crate::utils::token_prefix;

use super::errors::CoordinationError;
use super::types::{FlowRedirect, with_query};

/// Orchestrates Start, Callback, Link and Unlink over explicitly supplied
/// stores, provider registry and session issuer.
pub struct OAuthFlowController {
    pub(super) config: FlowConfig,
    pub(super) providers: Arc<dyn ProviderRegistry>,
    pub(super) states: Arc<dyn StateStore>,
    pub(super) identities: Arc<dyn IdentityStore>,
    pub(super) users: Arc<dyn UserStore>,
    pub(super) sessions: Arc<dyn SessionIssuer>,
}

impl OAuthFlowController {
    pub fn new(
        config: FlowConfig,
        providers: Arc<dyn ProviderRegistry>,
        states: Arc<dyn StateStore>,
        identities: Arc<dyn IdentityStore>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionIssuer>,
    ) -> Self {
        Self {
            config,
            providers,
            states,
            identities,
            users,
            sessions,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn state_store(&self) -> Arc<dyn StateStore> {
        self.states.clone()
    }

    /// Names of the configured providers.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.names()
    }

    pub(super) fn provider(&self, name: &str) -> Option<Arc<dyn ProviderClient>> {
        self.providers.resolve(name)
    }

    /// Begin a login: persist a fresh state and redirect to the provider.
    #[tracing::instrument(skip(self, headers), fields(provider = %provider))]
    pub async fn start(
        &self,
        provider: &str,
        redirect: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<FlowRedirect, CoordinationError> {
        let client = self
            .provider(provider)
            .ok_or_else(|| CoordinationError::ProviderNotConfigured(provider.to_string()))?;
        let redirect_uri = normalize_redirect(redirect, &self.config.default_redirect)?;

        self.begin_authorization(client.as_ref(), redirect_uri, None, headers)
            .await
    }

    /// Begin linking `provider` to the signed-in user. The post-flow target is
    /// always the settings page.
    #[tracing::instrument(skip(self, headers), fields(provider = %provider, user_id = %user_id))]
    pub async fn link(
        &self,
        provider: &str,
        user_id: &str,
        headers: &HeaderMap,
    ) -> Result<FlowRedirect, CoordinationError> {
        let client = self
            .provider(provider)
            .ok_or_else(|| CoordinationError::ProviderNotConfigured(provider.to_string()))?;

        if self.users.get_user(user_id).await?.is_none() {
            return Err(CoordinationError::Unauthorized.log());
        }
        if self
            .identities
            .get_for_user(user_id, provider)
            .await?
            .is_some()
        {
            return Err(CoordinationError::Conflict("already_linked".to_string()).log());
        }

        let redirect_uri = self.config.settings_path.clone();
        self.begin_authorization(client.as_ref(), redirect_uri, Some(user_id.to_string()), headers)
            .await
    }

    async fn begin_authorization(
        &self,
        client: &dyn ProviderClient,
        redirect_uri: String,
        link_user_id: Option<String>,
        headers: &HeaderMap,
    ) -> Result<FlowRedirect, CoordinationError> {
        let origin = RequestOrigin::from_headers(headers, &self.config.default_scheme)?;
        let callback_url = origin.callback_url(&self.config, client.name());

        let state_token = generate_state_token()?;
        let code_verifier = generate_code_verifier()?;
        let nonce = generate_nonce()?;
        let code_challenge = code_challenge_s256(&code_verifier);

        let state = OAuthState::new(
            state_token,
            client.name(),
            redirect_uri,
            code_verifier,
            nonce,
            link_user_id,
        );
        self.states.save(&state).await?;

        let location = client.authorization_url(&AuthorizationRequest {
            redirect_uri: &callback_url,
            state: &state.state,
            code_challenge: &code_challenge,
            nonce: &state.nonce,
        })?;

        tracing::info!(
            state = token_prefix(&state.state),
            link = state.is_link(),
            "Redirecting to provider authorization endpoint"
        );
        Ok(FlowRedirect::to(location))
    }

    /// Remove the signed-in user's identity at `provider`, refusing when a
    /// passwordless user would be left without any way to sign in.
    #[tracing::instrument(skip(self), fields(provider = %provider, user_id = %user_id))]
    pub async fn unlink(
        &self,
        provider: &str,
        user_id: &str,
    ) -> Result<FlowRedirect, CoordinationError> {
        let user = self.users.get_user(user_id).await?.ok_or_else(|| {
            CoordinationError::ResourceNotFound {
                resource_type: "user".to_string(),
                resource_id: user_id.to_string(),
            }
            .log()
        })?;

        let keep_last = !user.has_password();
        match self
            .identities
            .remove_for_user(user_id, provider, keep_last)
            .await?
        {
            RemoveOutcome::Removed(count) => {
                tracing::info!(count, "Unlinked provider identity");
                Ok(FlowRedirect::to(with_query(
                    &self.config.settings_path,
                    "unlinked",
                    provider,
                )))
            }
            RemoveOutcome::NotFound => Err(CoordinationError::ResourceNotFound {
                resource_type: "identity".to_string(),
                resource_id: provider.to_string(),
            }
            .log()),
            RemoveOutcome::WouldOrphan => {
                Err(CoordinationError::WouldOrphan(provider.to_string()).log())
            }
        }
    }

    /// Token-free list of the user's linked identities.
    pub async fn list_identities(
        &self,
        user_id: &str,
    ) -> Result<Vec<IdentitySummary>, CoordinationError> {
        let identities = self.identities.list_for_user(user_id).await?;
        Ok(identities.iter().map(IdentitySummary::from).collect())
    }

    /// Issue a session for `user` and redirect to `redirect` when it is a
    /// local path, else to the default landing page.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn login_user(
        &self,
        user: &User,
        redirect: &str,
    ) -> Result<FlowRedirect, CoordinationError> {
        let credential = self.sessions.issue(user, DEFAULT_ROLE).await?;
        let headers = session_cookie_headers(self.sessions.cookie_name(), &credential)?;

        let location = safe_redirect(redirect, &self.config.default_redirect);
        tracing::info!(location, "Session established");
        Ok(FlowRedirect::to(location).with_headers(headers))
    }

    /// Clear the session cookie.
    pub fn logout(&self) -> Result<FlowRedirect, CoordinationError> {
        let headers = logout_cookie_headers(self.sessions.cookie_name())?;
        Ok(FlowRedirect::to(self.config.default_redirect.clone()).with_headers(headers))
    }

    /// Claims of the session carried by `headers`. Missing, invalid and
    /// expired credentials all yield `None`.
    pub async fn session_claims(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<SessionClaims>, CoordinationError> {
        let Some(token) = get_session_token_from_headers(headers, self.sessions.cookie_name())?
        else {
            return Ok(None);
        };

        match self.sessions.verify(token).await {
            Ok(claims) => Ok(Some(claims)),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unusable session credential");
                Ok(None)
            }
        }
    }
}
