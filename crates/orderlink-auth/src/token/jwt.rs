//! JWT bearer-token validation.
//!
//! Tokens are HMAC-signed (HS256, HS384 or HS512) with a shared secret. Only
//! validation lives here; issuing tokens is somebody else's job.
//!
//! ## Claims
//!
//! - `sub` (required): the principal's subject
//! - `exp` (required): expiry, seconds since the epoch
//! - `authorities` (optional, alias `auth`): comma-separated authority list
//!
//! ## Example
//!
//! ```ignore
//! use orderlink_auth::token::jwt::AuthGate;
//!
//! let gate = AuthGate::new(&config)?;
//! match gate.authenticate(raw_token).await {
//!     Some(principal) => println!("hello {}", principal.subject),
//!     None => println!("denied"),
//! }
//! ```

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::principal::Principal;

/// HMAC algorithms accepted for a shared secret.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while decoding a token.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError { message: String },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims { message: String },
}

impl JwtError {
    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidSubject | ErrorKind::MissingRequiredClaim(_) => {
                Self::invalid_claims(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            other => AuthError::invalid_token(other.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims read from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, alias = "auth", skip_serializing_if = "Option::is_none")]
    pub authorities: Option<String>,
}

impl Claims {
    fn into_principal(self) -> Principal {
        Principal::from_claims(self.sub, self.authorities.as_deref())
    }
}

// ============================================================================
// Auth Gate
// ============================================================================

/// Validates bearer credentials and derives a [`Principal`].
///
/// Stateless: nothing is remembered between calls.
#[derive(Clone)]
pub struct AuthGate {
    key: DecodingKey,
    validation: Validation,
}

impl AuthGate {
    /// Build a gate from validated configuration.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self::from_secret(config.secret.as_bytes(), config.leeway_secs))
    }

    /// Build a gate directly from a shared secret.
    pub fn from_secret(secret: &[u8], leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Decode and validate a token.
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;
        if claims.sub.trim().is_empty() {
            return Err(JwtError::invalid_claims("subject is empty"));
        }
        Ok(claims)
    }

    /// Validate a raw token, keeping the failure cause.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        Ok(self.decode(token)?.into_principal())
    }

    /// Validate a raw token. Any failure yields `None`.
    pub async fn authenticate(&self, token: &str) -> Option<Principal> {
        match self.verify(token) {
            Ok(principal) => Some(principal),
            Err(e) => {
                debug!(error = %e, "Token validation failed");
                None
            }
        }
    }

    /// Validate the value of an `Authorization` header.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let header = header.ok_or(AuthError::MissingCredentials)?;
        let token = bearer_token(header).ok_or(AuthError::MalformedHeader)?;
        self.verify(token)
    }

    /// Validate the value of an `Authorization` header. Any failure yields `None`.
    pub async fn authenticate_header(&self, header: Option<&str>) -> Option<Principal> {
        self.verify_header(header).ok()
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

/// Extracts the token from a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use time::OffsetDateTime;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn token(alg: Algorithm, secret: &[u8], claims: &serde_json::Value) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn in_secs(offset: i64) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp() + offset
    }

    #[tokio::test]
    async fn test_valid_token_yields_principal() {
        let gate = AuthGate::from_secret(SECRET, 0);
        let raw = token(
            Algorithm::HS256,
            SECRET,
            &serde_json::json!({"sub": "alice", "exp": in_secs(3600), "auth": "ROLE_USER"}),
        );

        let principal = gate.authenticate(&raw).await.unwrap();
        assert_eq!(principal.subject, "alice");
        assert!(principal.has_authority("ROLE_USER"));
    }

    #[tokio::test]
    async fn test_hs512_accepted() {
        let gate = AuthGate::from_secret(SECRET, 0);
        let raw = token(
            Algorithm::HS512,
            SECRET,
            &serde_json::json!({"sub": "bob", "exp": in_secs(60), "authorities": "A,B"}),
        );
        let principal = gate.authenticate(&raw).await.unwrap();
        assert_eq!(principal.authorities.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_authorities_is_empty_set() {
        let gate = AuthGate::from_secret(SECRET, 0);
        let raw = token(
            Algorithm::HS256,
            SECRET,
            &serde_json::json!({"sub": "alice", "exp": in_secs(60)}),
        );
        let principal = gate.authenticate(&raw).await.unwrap();
        assert!(principal.authorities.is_empty());
    }

    #[test]
    fn test_expired_token_rejected() {
        let gate = AuthGate::from_secret(SECRET, 0);
        let raw = token(
            Algorithm::HS256,
            SECRET,
            &serde_json::json!({"sub": "alice", "exp": in_secs(-3600)}),
        );
        assert!(matches!(gate.decode(&raw), Err(JwtError::Expired)));
        assert!(matches!(gate.verify(&raw), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let gate = AuthGate::from_secret(SECRET, 0);
        let raw = token(
            Algorithm::HS256,
            b"another-secret-another-secret-xx",
            &serde_json::json!({"sub": "alice", "exp": in_secs(3600)}),
        );
        assert!(matches!(gate.decode(&raw), Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_missing_subject_rejected() {
        let gate = AuthGate::from_secret(SECRET, 0);
        let raw = token(
            Algorithm::HS256,
            SECRET,
            &serde_json::json!({"exp": in_secs(3600)}),
        );
        let err = gate.verify(&raw).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));

        let raw = token(
            Algorithm::HS256,
            SECRET,
            &serde_json::json!({"sub": " ", "exp": in_secs(3600)}),
        );
        assert!(gate.verify(&raw).is_err());
    }

    #[tokio::test]
    async fn test_garbage_token_is_none() {
        let gate = AuthGate::from_secret(SECRET, 0);
        assert!(gate.authenticate("not.a.jwt").await.is_none());
        assert!(gate.authenticate("").await.is_none());
    }

    #[tokio::test]
    async fn test_header_parsing() {
        let gate = AuthGate::from_secret(SECRET, 0);
        let raw = token(
            Algorithm::HS256,
            SECRET,
            &serde_json::json!({"sub": "alice", "exp": in_secs(60)}),
        );

        let header = format!("Bearer {raw}");
        assert!(gate.authenticate_header(Some(header.as_str())).await.is_some());
        assert!(gate.authenticate_header(Some(raw.as_str())).await.is_none());
        assert!(matches!(
            gate.verify_header(None),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            gate.verify_header(Some("Basic abc")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            gate.verify_header(Some("Bearer ")),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn test_gate_from_config_validates() {
        let config = AuthConfig::default();
        assert!(AuthGate::new(&config).is_err());
    }
}
