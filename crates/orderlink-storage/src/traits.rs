//! Storage traits for the backing-store abstraction layer.
//!
//! This module defines the contract every backing store implements. Stores
//! are generic over the record type so the same backend serves users and
//! orders.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use async_trait::async_trait;

use crate::error::StorageError;

/// Identifier of a stored record.
pub trait RecordId: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {
    /// Produce a fresh id. `sequence` is a monotonically increasing counter
    /// maintained by the store; id types that do not need it may ignore it.
    fn generate(sequence: u64) -> Self;
}

impl RecordId for i64 {
    fn generate(sequence: u64) -> Self {
        i64::try_from(sequence).unwrap_or(i64::MAX)
    }
}

impl RecordId for uuid::Uuid {
    fn generate(_sequence: u64) -> Self {
        uuid::Uuid::new_v4()
    }
}

/// A value that can live in a [`RecordStore`].
pub trait Record: Clone + Debug + Send + Sync + 'static {
    type Id: RecordId;

    /// Kind name used in errors and logs (e.g. `"Order"`).
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;

    /// Subject key that groups dependent records (the owning username).
    fn owner(&self) -> &str;

    /// Fields that must be unique across all records of this kind.
    fn unique_fields(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

impl DeleteOutcome {
    pub fn is_deleted(self) -> bool {
        matches!(self, DeleteOutcome::Deleted)
    }
}

/// The main storage trait that all backing stores must implement.
///
/// Every call is a suspension point. Implementations must be thread-safe.
///
/// # Example
///
/// ```ignore
/// use orderlink_storage::{Order, RecordStore, StorageError};
///
/// async fn load(store: &dyn RecordStore<Order>, id: &uuid::Uuid) -> Result<Order, StorageError> {
///     store
///         .get_by_id(id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Order", id))
/// }
/// ```
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    // ==================== Reads ====================

    /// Reads a record by id.
    ///
    /// Returns `None` if the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing records.
    async fn get_by_id(&self, id: &R::Id) -> Result<Option<R>, StorageError>;

    /// Lists every record owned by `owner`, in no particular order.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<R>, StorageError>;

    /// Lists every record.
    async fn list_all(&self) -> Result<Vec<R>, StorageError>;

    // ==================== Writes ====================

    /// Inserts or replaces a record keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UniqueViolation` if another record already holds
    /// one of this record's unique fields.
    async fn save(&self, record: &R) -> Result<R, StorageError>;

    /// Deletes a record by id.
    async fn delete_by_id(&self, id: &R::Id) -> Result<DeleteOutcome, StorageError>;

    /// Allocates an id for a new record.
    async fn next_id(&self) -> Result<R::Id, StorageError>;

    // ==================== Transactions ====================

    /// Begins a new transaction.
    ///
    /// The transaction must be either committed or rolled back; dropping it
    /// without either discards its writes.
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction<R>>, StorageError>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

/// A unit of work whose writes become visible together on commit.
#[async_trait]
pub trait Transaction<R: Record>: Send + Sync {
    /// Commits all operations in this transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` or a constraint error if the
    /// commit fails; in that case none of the writes are visible.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Rolls back all operations in this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;

    /// Stages an upsert.
    async fn save(&mut self, record: &R) -> Result<R, StorageError>;

    /// Stages a delete.
    async fn delete(&mut self, id: &R::Id) -> Result<DeleteOutcome, StorageError>;

    /// Reads a record, seeing writes staged in this transaction.
    async fn get(&self, id: &R::Id) -> Result<Option<R>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids() {
        assert_eq!(<i64 as RecordId>::generate(5), 5);
        assert_eq!(<i64 as RecordId>::generate(u64::MAX), i64::MAX);
        let a = <uuid::Uuid as RecordId>::generate(1);
        let b = <uuid::Uuid as RecordId>::generate(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_delete_outcome() {
        assert!(DeleteOutcome::Deleted.is_deleted());
        assert!(!DeleteOutcome::NotFound.is_deleted());
    }
}
