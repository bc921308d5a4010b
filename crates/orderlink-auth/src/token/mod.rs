//! Bearer-token handling.

pub mod jwt;

pub use jwt::{AuthGate, Claims, JwtError, bearer_token};
