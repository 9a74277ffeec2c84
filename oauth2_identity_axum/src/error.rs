use http::{Result as HttpResponse, StatusCode};
use oauth2_identity::CoordinationError;

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

/// Client errors carry their message; server faults stay opaque.
impl<T> IntoResponseError<T> for Result<T, CoordinationError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match e {
                CoordinationError::BadRequest(_) => StatusCode::BAD_REQUEST,
                CoordinationError::InvalidRedirect(_) => StatusCode::BAD_REQUEST,
                CoordinationError::Unauthorized => StatusCode::UNAUTHORIZED,
                CoordinationError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
                CoordinationError::Conflict(_) => StatusCode::CONFLICT,
                CoordinationError::WouldOrphan(_) => StatusCode::CONFLICT,
                CoordinationError::ProviderNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
                tracing::error!(error = %e, "Request failed");
                (status, "Internal server error".to_string())
            } else {
                (status, e.to_string())
            }
        })
    }
}

/// Implementation for http::Error (used by Response::builder())
impl<T> IntoResponseError<T> for HttpResponse<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}
