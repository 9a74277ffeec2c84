use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum IdentityError {
    #[error("Identity not found")]
    NotFound,

    /// `(provider, provider_user_id)` is already bound
    #[error("Identity already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                IdentityError::AlreadyExists(db.message().to_string())
            }
            _ => IdentityError::Storage(err.to_string()),
        }
    }
}
