mod errors;
mod pkce;
mod provider;
mod redirect;
mod state_store;
mod sweeper;
mod types;

pub use errors::{OAuth2Error, ProviderError};
pub use pkce::{
    CODE_CHALLENGE_METHOD, code_challenge_s256, generate_code_verifier, generate_nonce,
    generate_state_token,
};
pub use provider::{
    OidcProviderClient, OidcProviderConfig, ProfileFieldMap, ProviderClient, ProviderRegistry,
    StaticProviderRegistry,
};
pub use redirect::{RequestOrigin, is_local_path, normalize_redirect, safe_redirect};
pub use state_store::{CacheStateStore, StateStore};
pub use sweeper::StateSweeper;
pub use types::{
    AuthorizationRequest, IdTokenClaims, OAuthState, ProviderProfile, ProviderTokens,
};
