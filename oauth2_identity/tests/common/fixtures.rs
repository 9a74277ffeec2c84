use http::HeaderMap;
use http::header::{COOKIE, HOST, SET_COOKIE};
use oauth2_identity::{FlowRedirect, ProviderProfile};
use serde_json::json;

pub const TEST_HOST: &str = "app.example.com";
pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Provider profile with a verified email.
pub fn verified_profile(sub: &str, email: &str, name: &str) -> ProviderProfile {
    ProviderProfile {
        provider_user_id: sub.to_string(),
        email: Some(email.to_string()),
        email_verified: true,
        name: Some(name.to_string()),
        avatar_url: None,
        raw: json!({ "sub": sub, "email": email, "email_verified": true, "name": name }),
    }
}

pub fn unverified_profile(sub: &str, email: &str, name: &str) -> ProviderProfile {
    ProviderProfile {
        email_verified: false,
        ..verified_profile(sub, email, name)
    }
}

/// Request headers of a browser hitting the app directly.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(HOST, TEST_HOST.parse().unwrap());
    headers
}

/// Browser headers carrying the session cookie set by `redirect`.
pub fn headers_with_session(redirect: &FlowRedirect) -> HeaderMap {
    let mut headers = browser_headers();
    let cookie = session_cookie_pair(redirect).expect("redirect sets a session cookie");
    headers.insert(COOKIE, cookie.parse().unwrap());
    headers
}

/// `name=value` of the first `Set-Cookie` header.
pub fn session_cookie_pair(redirect: &FlowRedirect) -> Option<String> {
    let header = redirect.headers.get(SET_COOKIE)?.to_str().ok()?;
    header.split(';').next().map(|pair| pair.trim().to_string())
}

/// Value of query parameter `key` in an absolute or path-only location.
pub fn query_param(location: &str, key: &str) -> Option<String> {
    let url = if location.starts_with('/') {
        url::Url::parse(&format!("http://{TEST_HOST}{location}")).ok()?
    } else {
        url::Url::parse(location).ok()?
    };
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
