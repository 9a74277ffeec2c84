mod client;
mod config;
mod idtoken;
mod oidc;
mod registry;

pub use client::ProviderClient;
pub use config::{OidcProviderConfig, ProfileFieldMap};
pub use oidc::OidcProviderClient;
pub use registry::{ProviderRegistry, StaticProviderRegistry};
