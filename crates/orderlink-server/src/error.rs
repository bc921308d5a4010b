//! HTTP-facing error type.
//!
//! Every error renders as `{"error": <title>, "message": <detail>}`. Internal
//! errors are logged in full and answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use orderlink_auth::AuthError;
use orderlink_storage::StorageError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Auth(AuthError::forbidden(msg))
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(e) if e.is_authentication_error() => StatusCode::UNAUTHORIZED,
            Self::Auth(e) if e.is_authorization_error() => StatusCode::FORBIDDEN,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, id } => Self::NotFound(format!("{kind} {id}")),
            StorageError::UniqueViolation { field, value } => {
                Self::Conflict(format!("{field} '{value}' is already taken"))
            }
            StorageError::InvalidRecord { message } => Self::BadRequest(message),
            other => {
                tracing::error!(error = %other, category = %other.category(), "Storage failure");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (title, message) = match self {
            // Auth errors carry their own body and challenge header.
            Self::Auth(e) => return e.into_response(),
            Self::BadRequest(m) => ("Bad Request", m),
            Self::NotFound(m) => ("Not Found", m),
            Self::Conflict(m) => ("Conflict", m),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    "Internal Server Error",
                    "An unexpected error occurred".to_string(),
                )
            }
        };
        (status, Json(json!({"error": title, "message": message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(StorageError::unique_violation("email", "a@x.io")).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StorageError::not_found("Order", "1")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StorageError::connection_error("down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::forbidden("not yours").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::TokenExpired).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_internal_message_is_generic() {
        let response = ApiError::internal("pool exhausted at 10.0.0.3").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], "An unexpected error occurred");
    }

    #[test]
    fn test_response_status_matches_status_code() {
        let errors = [
            ApiError::bad_request("blank username"),
            ApiError::not_found("User 9"),
            ApiError::conflict("taken"),
            ApiError::internal("boom"),
            ApiError::forbidden("not yours"),
            ApiError::from(AuthError::TokenExpired),
        ];
        for err in errors {
            let expected = err.status_code();
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_conflict_body() {
        let response = ApiError::conflict("username 'alice' is already taken").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Conflict");
    }
}
