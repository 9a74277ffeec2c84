use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session expired")]
    Expired,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Header error: {0}")]
    HeaderError(String),

    #[error("Session configuration error: {0}")]
    Config(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::InvalidToken(err.to_string()),
        }
    }
}
