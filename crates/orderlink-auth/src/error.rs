//! Authentication and authorization error types.

use std::fmt;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("Authentication required")]
    MissingCredentials,

    /// The `Authorization` header is not `Bearer <token>`.
    #[error("Invalid Authorization header format")]
    MalformedHeader,

    /// The token is malformed, badly signed, or lacks required claims.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The principal is authenticated but may not perform the action.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the request carries no usable identity (401).
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::MalformedHeader
                | Self::InvalidToken { .. }
                | Self::TokenExpired
        )
    }

    /// Returns `true` if the identity is known but lacks permission (403).
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        if self.is_authentication_error() {
            ErrorCategory::Authentication
        } else if self.is_authorization_error() {
            ErrorCategory::Authorization
        } else if matches!(self, Self::Configuration { .. }) {
            ErrorCategory::Configuration
        } else {
            ErrorCategory::Internal
        }
    }
}

/// Categories of auth errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    Configuration,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(AuthError::TokenExpired.to_string(), "Token expired");
        assert_eq!(
            AuthError::invalid_token("bad signature").to_string(),
            "Invalid token: bad signature"
        );
        assert_eq!(
            AuthError::MissingCredentials.to_string(),
            "Authentication required"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::MalformedHeader.is_authentication_error());
        assert!(!AuthError::MalformedHeader.is_authorization_error());
        assert!(AuthError::forbidden("not owner").is_authorization_error());
        assert_eq!(
            AuthError::internal("x").category(),
            ErrorCategory::Internal
        );
        assert_eq!(
            AuthError::configuration("x").category().to_string(),
            "configuration"
        );
    }
}
