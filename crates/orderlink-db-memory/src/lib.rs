//! In-memory backing store for orderlink.
//!
//! Suitable for tests and single-process deployments; nothing survives a
//! restart.

mod storage;

pub use storage::InMemoryStore;
