//! Error types for flow coordination

use thiserror::Error;

use crate::identity::IdentityError;
use crate::oauth2::{OAuth2Error, ProviderError};
use crate::session::SessionError;
use crate::userdb::UserError;
use crate::utils::UtilError;

/// Errors returned by [`OAuthFlowController`](super::OAuthFlowController)
/// operations that do not end in a redirect.
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// Malformed or incomplete request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Post-login target that is not a local path
    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    /// No valid session
    #[error("Unauthorized access")]
    Unauthorized,

    /// Provider name not present in the registry
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unlinking would leave a passwordless user with no sign-in method
    #[error("Cannot unlink {0}: the account would have no way to log in")]
    WouldOrphan(String),

    /// Resource not found with context
    #[error("Resource not found: {resource_type} {resource_id}")]
    ResourceNotFound {
        resource_type: String,
        resource_id: String,
    },

    /// Error from OAuth2 state handling
    #[error("OAuth2 error: {0}")]
    OAuth2Error(OAuth2Error),

    /// Error from a provider client
    #[error("Provider error: {0}")]
    ProviderError(ProviderError),

    /// Error from identity storage
    #[error("Identity error: {0}")]
    IdentityError(IdentityError),

    /// Error from the user database operations
    #[error("User error: {0}")]
    UserError(UserError),

    /// Error from Session operations
    #[error("Session error: {0}")]
    SessionError(SessionError),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    UtilsError(UtilError),
}

impl CoordinationError {
    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::BadRequest(msg) => tracing::warn!("Bad request: {}", msg),
            Self::InvalidRedirect(target) => tracing::warn!("Invalid redirect target: {}", target),
            Self::Unauthorized => tracing::warn!("Unauthorized access"),
            Self::ProviderNotConfigured(name) => {
                tracing::warn!("Provider not configured: {}", name)
            }
            Self::Conflict(message) => tracing::warn!("Conflict: {}", message),
            Self::WouldOrphan(provider) => {
                tracing::warn!("Refused to unlink last sign-in method: {}", provider)
            }
            Self::ResourceNotFound {
                resource_type,
                resource_id,
            } => tracing::warn!("Resource not found: {} {}", resource_type, resource_id),
            Self::OAuth2Error(err) => tracing::error!("OAuth2 error: {}", err),
            Self::ProviderError(err) => tracing::error!("Provider error: {}", err),
            Self::IdentityError(err) => tracing::error!("Identity error: {}", err),
            Self::UserError(err) => tracing::error!("User error: {}", err),
            Self::SessionError(err) => tracing::error!("Session error: {}", err),
            Self::UtilsError(err) => tracing::error!("Utils error: {}", err),
        }
        self
    }
}

// Custom From implementations that automatically log errors

impl From<OAuth2Error> for CoordinationError {
    fn from(err: OAuth2Error) -> Self {
        let error = match err {
            OAuth2Error::InvalidRedirect(target) => Self::InvalidRedirect(target),
            OAuth2Error::InvalidOrigin(msg) => Self::BadRequest(msg),
            other => Self::OAuth2Error(other),
        };
        tracing::error!("{}", error);
        error
    }
}

impl From<ProviderError> for CoordinationError {
    fn from(err: ProviderError) -> Self {
        let error = Self::ProviderError(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<IdentityError> for CoordinationError {
    fn from(err: IdentityError) -> Self {
        let error = Self::IdentityError(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<UserError> for CoordinationError {
    fn from(err: UserError) -> Self {
        let error = Self::UserError(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<SessionError> for CoordinationError {
    fn from(err: SessionError) -> Self {
        let error = Self::SessionError(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<UtilError> for CoordinationError {
    fn from(err: UtilError) -> Self {
        let error = Self::UtilsError(err);
        tracing::error!("{}", error);
        error
    }
}
