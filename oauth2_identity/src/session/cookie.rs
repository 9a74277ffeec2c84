use chrono::Utc;
use http::header::{COOKIE, HeaderMap};

use crate::utils::header_set_cookie;

use super::errors::SessionError;
use super::types::SessionCredential;

/// `Set-Cookie` header establishing the session.
pub fn session_cookie_headers(
    cookie_name: &str,
    credential: &SessionCredential,
) -> Result<HeaderMap, SessionError> {
    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        cookie_name,
        &credential.token,
        credential.max_age(Utc::now()),
    )?;
    Ok(headers)
}

/// `Set-Cookie` header that expires the session cookie.
pub fn logout_cookie_headers(cookie_name: &str) -> Result<HeaderMap, SessionError> {
    let mut headers = HeaderMap::new();
    header_set_cookie(&mut headers, cookie_name, "value", -86400)?;
    Ok(headers)
}

pub fn get_session_token_from_headers<'a>(
    headers: &'a HeaderMap,
    cookie_name: &str,
) -> Result<Option<&'a str>, SessionError> {
    let mut found = None;
    for cookie_header in headers.get_all(COOKIE) {
        let cookie_str = cookie_header.to_str().map_err(|e| {
            tracing::error!("Invalid cookie header: {}", e);
            SessionError::HeaderError("Invalid cookie header".to_string())
        })?;

        found = cookie_str.split(';').map(|s| s.trim()).find_map(|s| {
            let mut parts = s.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(k), Some(v)) if k == cookie_name && !v.is_empty() => Some(v),
                _ => None,
            }
        });
        if found.is_some() {
            break;
        }
    }

    if found.is_none() {
        tracing::debug!("No session cookie '{}' found in cookies", cookie_name);
    }
    Ok(found)
}
