//! Authentication configuration.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Minimum HMAC secret length in bytes (256 bits).
pub const MIN_SECRET_BYTES: usize = 32;

/// Bearer-token validation settings.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// secret = "change-me-to-at-least-thirty-two-bytes"
/// leeway_secs = 0
/// public_paths = ["/healthz", "/auth/register"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret used to verify HS256/HS384/HS512 signatures.
    pub secret: String,

    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_secs: u64,

    /// Paths that skip authentication. An entry ending in `*` matches by prefix.
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            leeway_secs: 0,
            public_paths: vec!["/healthz".to_string(), "/auth/register".to_string()],
        }
    }
}

impl AuthConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::configuration("auth.secret cannot be empty"));
        }
        if self.secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::configuration(format!(
                "auth.secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }
        if let Some(bad) = self.public_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(AuthError::configuration(format!(
                "public path '{bad}' must start with '/'"
            )));
        }
        Ok(())
    }

    /// Returns `true` if `path` is exempt from authentication.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| match p.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => p == path,
        })
    }
}
