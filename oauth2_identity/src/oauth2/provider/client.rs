use async_trait::async_trait;

use crate::oauth2::errors::ProviderError;
use crate::oauth2::types::{AuthorizationRequest, IdTokenClaims, ProviderProfile, ProviderTokens};

/// One configured identity provider.
#[async_trait]
pub trait ProviderClient: Send + Sync + 'static {
    /// Name used in routes and stored on identities, e.g. `github`.
    fn name(&self) -> &str;

    /// Authorization endpoint URL carrying state, nonce and the S256 challenge.
    fn authorization_url(&self, request: &AuthorizationRequest<'_>)
    -> Result<String, ProviderError>;

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<ProviderTokens, ProviderError>;

    async fn fetch_profile(&self, tokens: &ProviderTokens)
    -> Result<ProviderProfile, ProviderError>;

    /// Verify an ID token. `Ok(None)` means this provider does not verify
    /// ID tokens.
    async fn verify_id_token(&self, _id_token: &str) -> Result<Option<IdTokenClaims>, ProviderError> {
        Ok(None)
    }
}
