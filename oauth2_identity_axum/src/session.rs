use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Redirect, Response},
};
use http::{Method, StatusCode, request::Parts};
use std::sync::Arc;

use oauth2_identity::{OAuthFlowController, SessionClaims};

/// Rejection of [`AuthUser`]: page loads are sent to the login page, other
/// requests get a 401.
pub struct AuthRedirect {
    method: Method,
    login_path: String,
}

impl AuthRedirect {
    fn new(method: Method, login_path: &str) -> Self {
        Self {
            method,
            login_path: login_path.to_string(),
        }
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        if self.method == Method::GET {
            tracing::debug!("Redirecting to {}", self.login_path);
            Redirect::temporary(&self.login_path).into_response()
        } else {
            tracing::debug!("Unauthorized");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

/// Signed-in user taken from the session cookie.
///
/// ```no_run
/// use oauth2_identity_axum::AuthUser;
///
/// async fn protected_handler(user: AuthUser) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<SessionClaims> for AuthUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<OAuthFlowController>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let controller = Arc::<OAuthFlowController>::from_ref(state);
        let rejection = || AuthRedirect::new(parts.method.clone(), &controller.config().login_path);

        match controller.session_claims(&parts.headers).await {
            Ok(Some(claims)) => Ok(AuthUser::from(claims)),
            Ok(None) => {
                tracing::debug!("No valid session");
                Err(rejection())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session");
                Err(rejection())
            }
        }
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    Arc<OAuthFlowController>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let result: Result<Self, Self::Rejection> =
            <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await;
        Ok(result.ok())
    }
}
