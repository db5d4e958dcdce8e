//! Authentication error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while authenticating a request
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthorization,

    #[error("Invalid Authorization header format")]
    InvalidAuthorizationFormat,

    #[error("Invalid or expired session token")]
    InvalidToken,

    #[error("Unknown user")]
    UnknownUser,

    #[error("Insufficient role")]
    InsufficientRole,

    #[error("Failed to load user")]
    UserLoadError,
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthorization
            | AuthError::InvalidAuthorizationFormat
            | AuthError::InvalidToken
            | AuthError::UnknownUser => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::UserLoadError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": "AUTHENTICATION_ERROR",
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_unauthorized() {
        assert_eq!(
            AuthError::MissingAuthorization.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::UnknownUser.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_load_error_is_internal() {
        assert_eq!(
            AuthError::UserLoadError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
