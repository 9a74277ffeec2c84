//! Open-redirect guard and callback URL derivation

use http::header::{HOST, HeaderMap};

use crate::config::FlowConfig;

use super::errors::OAuth2Error;

/// True when `path` can only resolve to this origin.
///
/// Accepts `/`-rooted paths (with optional query and fragment). Rejects
/// absolute URLs, scheme-relative `//host`, any backslash (browsers treat
/// `/\host` like `//host`) and control or whitespace characters.
pub fn is_local_path(path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") {
        return false;
    }
    !path
        .chars()
        .any(|c| c == '\\' || c.is_control() || c.is_whitespace())
}

/// Resolve the requested post-login target, defaulting when absent or empty.
pub fn normalize_redirect(requested: Option<&str>, default: &str) -> Result<String, OAuth2Error> {
    match requested.map(str::trim) {
        None | Some("") => Ok(default.to_string()),
        Some(path) if is_local_path(path) => Ok(path.to_string()),
        Some(path) => Err(OAuth2Error::InvalidRedirect(path.to_string())),
    }
}

/// Re-validate a stored target, silently falling back to `default`.
pub fn safe_redirect<'a>(path: &'a str, default: &'a str) -> &'a str {
    if is_local_path(path) { path } else { default }
}

/// Scheme and host the user agent used to reach this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    /// `X-Forwarded-Proto`/`X-Forwarded-Host` win over the defaults and `Host`.
    pub fn from_headers(headers: &HeaderMap, default_scheme: &str) -> Result<Self, OAuth2Error> {
        let scheme = first_header_value(headers, "x-forwarded-proto")
            .unwrap_or(default_scheme)
            .to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(OAuth2Error::InvalidOrigin(format!(
                "unsupported scheme: {scheme}"
            )));
        }

        let host = first_header_value(headers, "x-forwarded-host")
            .or_else(|| first_header_value(headers, HOST.as_str()))
            .ok_or_else(|| OAuth2Error::InvalidOrigin("missing host".to_string()))?;
        if !is_valid_host(host) {
            return Err(OAuth2Error::InvalidOrigin(format!("invalid host: {host}")));
        }

        Ok(Self {
            scheme,
            host: host.to_ascii_lowercase(),
        })
    }

    /// Callback URL for `provider`. Start and Callback both derive it here so
    /// the value sent in the authorization request and the one sent in the
    /// code exchange are identical.
    pub fn callback_url(&self, config: &FlowConfig, provider: &str) -> String {
        format!(
            "{}://{}{}",
            self.scheme,
            self.host,
            config.callback_path(provider)
        )
    }
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}
