//! # orderlink-storage
//!
//! Backing-store abstraction for orderlink.
//!
//! This crate defines the store contract, the stored entity types and the
//! commit-then-publish transaction wrapper. It contains no storage engine;
//! backends live in separate crates.
//!
//! The main trait is [`RecordStore`], which defines:
//! - Reads by id and by owner
//! - Upserts and deletes
//! - Id allocation
//! - Transactions

mod error;
pub mod evented;
mod traits;
mod types;

// Re-export everything from submodules
pub use error::{ErrorCategory, StorageError};
pub use evented::{CommitReport, EventedTransaction};
pub use traits::{DeleteOutcome, Record, RecordId, RecordStore, Transaction};
pub use types::{Address, Order, User};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore<R> = std::sync::Arc<dyn RecordStore<R>>;
