mod config;
mod cookie;
mod errors;
mod jwt;
mod types;

pub use config::SessionConfig;
pub use cookie::{get_session_token_from_headers, logout_cookie_headers, session_cookie_headers};
pub use errors::SessionError;
pub use jwt::JwtSessionIssuer;
pub use types::{DEFAULT_ROLE, SessionClaims, SessionCredential, SessionIssuer};
