//! Error response handling for authentication middleware.
//!
//! Errors are rendered as `{"error": ..., "message": ...}`. 401 responses also
//! carry a `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, oauth_error, title) = error_details(&self);
        // Internal details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Authentication internal error");
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!(
                "Bearer error=\"{oauth_error}\", error_description=\"{}\"",
                message.replace('"', "'")
            );
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (
            status,
            headers,
            Json(json!({"error": title, "message": message})),
        )
            .into_response()
    }
}

/// Returns (HTTP status, OAuth error code, short title).
fn error_details(error: &AuthError) -> (StatusCode, &'static str, &'static str) {
    match error {
        AuthError::MissingCredentials | AuthError::MalformedHeader => {
            (StatusCode::UNAUTHORIZED, "invalid_request", "Unauthorized")
        }
        AuthError::InvalidToken { .. } | AuthError::TokenExpired => {
            (StatusCode::UNAUTHORIZED, "invalid_token", "Unauthorized")
        }
        AuthError::Forbidden { .. } => (StatusCode::FORBIDDEN, "access_denied", "Forbidden"),
        AuthError::Configuration { .. } | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "Internal Server Error",
        ),
    }
}
