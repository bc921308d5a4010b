//! Default-deny bearer authentication.
//!
//! [`authentication_middleware`] validates the `Authorization` header of every
//! request whose path is not explicitly public, and stores the resulting
//! [`Principal`] in the request extensions. Handlers read it back with the
//! `Principal` extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use orderlink_auth::{AuthState, Principal, authentication_middleware};
//!
//! async fn me(principal: Principal) -> String {
//!     principal.subject
//! }
//!
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn_with_state(auth_state, authentication_middleware));
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::principal::Principal;
use crate::token::AuthGate;

// =============================================================================
// Auth State
// =============================================================================

/// State required by [`authentication_middleware`].
#[derive(Clone, Debug)]
pub struct AuthState {
    pub gate: Arc<AuthGate>,
    pub config: Arc<AuthConfig>,
}

impl AuthState {
    /// Build the gate from configuration.
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let gate = AuthGate::new(&config)?;
        Ok(Self {
            gate: Arc::new(gate),
            config: Arc::new(config),
        })
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.config.is_public(path)
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Rejects every non-public request that lacks a valid bearer token.
pub async fn authentication_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if state.is_public(req.uri().path()) {
        return next.run(req).await;
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match state.gate.verify_header(header) {
        Ok(principal) => {
            tracing::debug!(subject = %principal.subject, "Token validated successfully");
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Request not authenticated");
            e.into_response()
        }
    }
}

// =============================================================================
// Extractor
// =============================================================================

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
