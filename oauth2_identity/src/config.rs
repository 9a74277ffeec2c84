//! Central configuration for the oauth2_identity crate

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Lifetime of a single authorization attempt.
pub const STATE_TTL_SECS: u64 = 600;

/// Flow-level settings, usually built once at startup with [`FlowConfig::from_env`].
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Mount point of the flow routes, e.g. `/auth/oauth`
    pub route_prefix: String,
    /// Where failed logins are sent, with `?error=<code>`
    pub login_path: String,
    /// Safe landing path when no (valid) redirect was requested
    pub default_redirect: String,
    /// Landing page for link and unlink results
    pub settings_path: String,
    /// Whether a callback may create brand-new local users
    pub allow_registration: bool,
    /// Fail the login when the identity row cannot be written for an otherwise resolved user
    pub strict_identity_persistence: bool,
    /// Scheme used for the callback URL when no `X-Forwarded-Proto` header is present
    pub default_scheme: String,
    /// Interval of the expired-state sweep
    pub state_sweep_interval: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            route_prefix: "/auth/oauth".to_string(),
            login_path: "/login".to_string(),
            default_redirect: "/".to_string(),
            settings_path: "/settings".to_string(),
            allow_registration: true,
            strict_identity_persistence: false,
            default_scheme: "https".to_string(),
            state_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl FlowConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            route_prefix: env_string("OAUTH2_ROUTE_PREFIX", defaults.route_prefix),
            login_path: env_string("OAUTH2_LOGIN_PATH", defaults.login_path),
            default_redirect: env_string("OAUTH2_DEFAULT_REDIRECT", defaults.default_redirect),
            settings_path: env_string("OAUTH2_SETTINGS_PATH", defaults.settings_path),
            allow_registration: env_parse("OAUTH2_ALLOW_REGISTRATION", defaults.allow_registration),
            strict_identity_persistence: env_parse(
                "OAUTH2_STRICT_IDENTITY_PERSISTENCE",
                defaults.strict_identity_persistence,
            ),
            default_scheme: env_string("OAUTH2_DEFAULT_SCHEME", defaults.default_scheme),
            state_sweep_interval: Duration::from_secs(env_parse(
                "OAUTH2_STATE_SWEEP_INTERVAL",
                defaults.state_sweep_interval.as_secs(),
            )),
        }
    }

    /// Path the provider redirects back to for `provider`.
    pub fn callback_path(&self, provider: &str) -> String {
        format!(
            "{}/{}/callback",
            self.route_prefix.trim_end_matches('/'),
            provider
        )
    }
}

pub(crate) fn env_string(key: &str, default: String) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default,
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, ?default, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
