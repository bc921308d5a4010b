//! # orderlink-auth
//!
//! Stateless bearer-token authentication for orderlink.
//!
//! - [`AuthGate`]: validates HMAC-signed JWTs and derives a [`Principal`]
//! - [`authentication_middleware`]: default-deny axum middleware
//! - [`password`]: Argon2 password hashing

pub mod config;
pub mod error;
pub mod middleware;
pub mod password;
pub mod principal;
pub mod token;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorCategory};
pub use middleware::{AuthState, authentication_middleware};
pub use principal::Principal;
pub use token::{AuthGate, Claims, JwtError};

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
