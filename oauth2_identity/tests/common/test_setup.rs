use async_trait::async_trait;
use std::sync::Arc;

use oauth2_identity::{
    CacheStateStore, CallbackParams, FlowConfig, FlowRedirect, Identity, IdentityError,
    IdentityStore, InMemoryCacheStore, InMemoryIdentityStore, InMemoryUserStore,
    JwtSessionIssuer, OAuthFlowController, ProviderProfile, RemoveOutcome, SessionConfig,
    StateStore, StaticProviderRegistry, User, UserStore,
};

use super::fixtures::{TEST_SECRET, browser_headers, query_param};
use super::mock_provider::MockProvider;

pub const PROVIDER: &str = "github";

/// Controller wired to in-memory stores and a single [`MockProvider`].
pub struct TestEnv {
    pub controller: Arc<OAuthFlowController>,
    pub provider: Arc<MockProvider>,
    pub users: Arc<InMemoryUserStore>,
    pub identities: Arc<InMemoryIdentityStore>,
    pub states: Arc<dyn StateStore>,
}

impl TestEnv {
    pub fn new(profile: ProviderProfile) -> Self {
        Self::with_config(profile, FlowConfig::default())
    }

    pub fn with_config(profile: ProviderProfile, config: FlowConfig) -> Self {
        let identities = Arc::new(InMemoryIdentityStore::new());
        Self::build(profile, config, identities.clone(), identities)
    }

    /// Environment whose identity inserts always fail with a storage error.
    pub fn with_failing_identity_inserts(profile: ProviderProfile, config: FlowConfig) -> Self {
        let identities = Arc::new(InMemoryIdentityStore::new());
        let failing = Arc::new(FailingInsertIdentityStore {
            inner: identities.clone(),
        });
        Self::build(profile, config, failing, identities)
    }

    fn build(
        profile: ProviderProfile,
        config: FlowConfig,
        identity_store: Arc<dyn IdentityStore>,
        identities: Arc<InMemoryIdentityStore>,
    ) -> Self {
        let provider = Arc::new(MockProvider::new(PROVIDER, profile));
        let registry = StaticProviderRegistry::new().with_provider(provider.clone());
        let states: Arc<dyn StateStore> =
            Arc::new(CacheStateStore::new(Arc::new(InMemoryCacheStore::new())));
        let users = Arc::new(InMemoryUserStore::new());
        let sessions = JwtSessionIssuer::new(SessionConfig::new(TEST_SECRET).unwrap());

        let controller = Arc::new(OAuthFlowController::new(
            config,
            Arc::new(registry),
            states.clone(),
            identity_store,
            users.clone(),
            Arc::new(sessions),
        ));

        Self {
            controller,
            provider,
            users,
            identities,
            states,
        }
    }

    /// Start a login and return the state token from the authorization URL.
    pub async fn start_login(&self, redirect: Option<&str>) -> String {
        let redirect = self
            .controller
            .start(PROVIDER, redirect, &browser_headers())
            .await
            .expect("start should succeed");
        query_param(&redirect.location, "state").expect("authorization URL carries state")
    }

    pub async fn callback(&self, state: &str, code: &str) -> FlowRedirect {
        self.callback_with_headers(state, code, &browser_headers())
            .await
    }

    pub async fn callback_with_headers(
        &self,
        state: &str,
        code: &str,
        headers: &http::HeaderMap,
    ) -> FlowRedirect {
        let params = CallbackParams {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            ..Default::default()
        };
        self.controller
            .callback(PROVIDER, &params, headers)
            .await
            .expect("callback always redirects")
    }

    /// Full login round trip with the provider's current profile.
    pub async fn login(&self) -> FlowRedirect {
        let state = self.start_login(None).await;
        self.callback(&state, "code-login").await
    }

    pub async fn create_user(&self, email: &str, name: &str) -> User {
        self.users
            .create_user(User::new(email.to_string(), name.to_string()))
            .await
            .unwrap()
    }
}

/// Identity store that delegates reads but refuses every insert.
struct FailingInsertIdentityStore {
    inner: Arc<InMemoryIdentityStore>,
}

#[async_trait]
impl IdentityStore for FailingInsertIdentityStore {
    async fn init(&self) -> Result<(), IdentityError> {
        self.inner.init().await
    }

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        self.inner.get_by_provider(provider, provider_user_id).await
    }

    async fn get_for_user(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        self.inner.get_for_user(user_id, provider).await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Identity>, IdentityError> {
        self.inner.list_for_user(user_id).await
    }

    async fn insert(&self, _identity: Identity) -> Result<Identity, IdentityError> {
        Err(IdentityError::Storage("disk full".to_string()))
    }

    async fn update_login(&self, identity: Identity) -> Result<Identity, IdentityError> {
        self.inner.update_login(identity).await
    }

    async fn remove_for_user(
        &self,
        user_id: &str,
        provider: &str,
        keep_last: bool,
    ) -> Result<RemoveOutcome, IdentityError> {
        self.inner.remove_for_user(user_id, provider, keep_last).await
    }
}
