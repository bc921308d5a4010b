//! HTTP middleware for authentication.
//!
//! - Bearer token extraction and validation
//! - Principal injection into request extensions
//! - JSON error responses

pub mod auth;
pub mod error;

pub use auth::{AuthState, authentication_middleware};
