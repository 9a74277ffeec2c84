use thiserror::Error;

use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum OAuth2Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serde error: {0}")]
    Serde(String),

    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    #[error("Invalid request origin: {0}")]
    InvalidOrigin(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<StorageError> for OAuth2Error {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for OAuth2Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Failures reported by a [`ProviderClient`](super::ProviderClient).
///
/// `Transport` and `TokenResponse` are kept apart so that a network failure
/// and an OAuth error returned by the token endpoint surface under different
/// codes.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Token endpoint returned an error: {0}")]
    TokenResponse(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Id token error: {0}")]
    IdToken(String),

    #[error("Provider configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ProviderError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::IdToken(err.to_string())
    }
}
