use http::HeaderMap;
use serde::Deserialize;
use std::fmt;

const MAX_PROVIDER_ERROR_LEN: usize = 64;

/// Where to send the user agent next, plus headers (cookies) to set.
#[derive(Debug, Clone)]
pub struct FlowRedirect {
    pub location: String,
    pub headers: HeaderMap,
}

impl FlowRedirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Query parameters of the provider's redirect back to the callback route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Stable error vocabulary placed in the `error` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowErrorCode {
    InvalidState,
    StateExpired,
    ExchangeFailed,
    TokenError,
    ProfileFailed,
    RegistrationDisabled,
    UserCreationFailed,
    IdentityCreationFailed,
    AlreadyLinked,
    UserNotFound,
    AccountDisabled,
    ServerError,
    /// Error code reported by the provider itself
    Provider(String),
}

impl FlowErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidState => "invalid_state",
            Self::StateExpired => "state_expired",
            Self::ExchangeFailed => "exchange_failed",
            Self::TokenError => "token_error",
            Self::ProfileFailed => "profile_failed",
            Self::RegistrationDisabled => "registration_disabled",
            Self::UserCreationFailed => "user_creation_failed",
            Self::IdentityCreationFailed => "identity_creation_failed",
            Self::AlreadyLinked => "already_linked",
            Self::UserNotFound => "user_not_found",
            Self::AccountDisabled => "account_disabled",
            Self::ServerError => "server_error",
            Self::Provider(code) => code,
        }
    }

    /// Provider codes pass through only as `[a-z0-9_]{1,64}`.
    pub fn from_provider(code: &str) -> Self {
        let valid = !code.is_empty()
            && code.len() <= MAX_PROVIDER_ERROR_LEN
            && code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Self::Provider(code.to_string())
        } else {
            Self::Provider("provider_error".to_string())
        }
    }

    /// Expected outcomes a user can cause, as opposed to faults.
    pub(crate) fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidState
                | Self::StateExpired
                | Self::RegistrationDisabled
                | Self::AlreadyLinked
                | Self::AccountDisabled
                | Self::Provider(_)
        )
    }
}

impl fmt::Display for FlowErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A callback failure: the public code plus an internal detail for logs.
#[derive(Debug, Clone)]
pub struct CallbackError {
    pub code: FlowErrorCode,
    pub detail: String,
}

impl CallbackError {
    pub fn new(code: FlowErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

/// Append `key=value` to a local path, URL-encoding the value.
pub(crate) fn with_query(path: &str, key: &str, value: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{key}={}", urlencoding::encode(value))
}
