//! oauth2_identity - Federated OAuth2/OIDC login for Rust web applications
//!
//! This crate runs the authorization code flow with PKCE against any number of
//! configured providers, reconciles provider accounts with local users, links
//! and unlinks identities, and issues the application session on success.
//! Storage, providers and the session issuer are supplied explicitly to
//! [`OAuthFlowController`].

mod config;
mod coordination;
mod identity;
mod oauth2;
mod session;
mod storage;
mod userdb;
mod utils;

pub use config::{FlowConfig, STATE_TTL_SECS};

pub use coordination::{
    CallbackError, CallbackParams, CoordinationError, FlowErrorCode, FlowRedirect,
    OAuthFlowController,
};

pub use identity::{
    Identity, IdentityError, IdentityStore, IdentitySummary, InMemoryIdentityStore,
    RemoveOutcome, SqlIdentityStore,
};

pub use oauth2::{
    AuthorizationRequest, CODE_CHALLENGE_METHOD, CacheStateStore, IdTokenClaims, OAuth2Error,
    OAuthState, OidcProviderClient, OidcProviderConfig, ProfileFieldMap, ProviderClient,
    ProviderError, ProviderProfile, ProviderRegistry, ProviderTokens, RequestOrigin,
    StateStore, StateSweeper, StaticProviderRegistry, code_challenge_s256,
    generate_code_verifier, generate_nonce, generate_state_token, is_local_path,
    normalize_redirect, safe_redirect,
};

pub use session::{
    DEFAULT_ROLE, JwtSessionIssuer, SessionClaims, SessionConfig, SessionCredential,
    SessionError, SessionIssuer, get_session_token_from_headers,
};

pub use storage::{
    CacheData, CacheStore, DEFAULT_TABLE_PREFIX, DataStore, InMemoryCacheStore,
    PostgresDataStore, RedisCacheStore, SqliteDataStore, StorageError, connect_cache_store,
    connect_data_store,
};

pub use userdb::{InMemoryUserStore, SqlUserStore, User, UserError, UserStatus, UserStore};

pub use utils::UtilError;
