use std::collections::HashMap;
use std::sync::Arc;

use crate::oauth2::errors::ProviderError;

use super::client::ProviderClient;
use super::config::{OidcProviderConfig, configured_provider_names};
use super::oidc::OidcProviderClient;

/// Capability map from provider name to client.
pub trait ProviderRegistry: Send + Sync + 'static {
    fn resolve(&self, name: &str) -> Option<Arc<dyn ProviderClient>>;

    fn names(&self) -> Vec<String>;
}

/// Fixed set of providers built at startup.
#[derive(Default, Clone)]
pub struct StaticProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
}

impl StaticProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.register(provider);
        self
    }

    pub fn register(&mut self, provider: Arc<dyn ProviderClient>) {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::warn!(provider = %name, "Replaced already registered provider");
        }
    }

    /// Build an [`OidcProviderClient`] for every name in `OAUTH2_PROVIDERS`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        for name in configured_provider_names() {
            let config = OidcProviderConfig::from_env(&name)?;
            registry.register(Arc::new(OidcProviderClient::new(config)?));
            tracing::info!(provider = %name, "Registered OAuth2 provider");
        }
        if registry.providers.is_empty() {
            tracing::warn!("No OAuth2 providers configured");
        }
        Ok(registry)
    }
}

impl ProviderRegistry for StaticProviderRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn ProviderClient>> {
        self.providers.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}
