use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use orderlink_storage::{DeleteOutcome, Record, RecordId, RecordStore, StorageError, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory backing store using a sharded concurrent map.
///
/// This storage implementation provides:
/// - Lock-free concurrent reads via `DashMap`
/// - Upserts with per-kind uniqueness constraints
/// - Sequential id allocation
/// - Transactions that stage writes and apply them atomically on commit
pub struct InMemoryStore<R: Record> {
    inner: Arc<StoreInner<R>>,
}

struct StoreInner<R: Record> {
    data: DashMap<R::Id, R>,
    /// Atomic counter for generating ids
    sequence: AtomicU64,
    /// Serializes constraint checks with the writes they guard.
    write_lock: Mutex<()>,
}

impl<R: Record> InMemoryStore<R> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                data: DashMap::new(),
                sequence: AtomicU64::new(1),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Creates an empty store wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> StoreInner<R> {
    /// Checks `candidate` against every other visible record. `overlay` holds
    /// staged writes that shadow committed data (`None` = staged delete).
    fn check_unique(
        &self,
        candidate: &R,
        overlay: &HashMap<R::Id, Option<R>>,
    ) -> Result<(), StorageError> {
        let wanted = candidate.unique_fields();
        if wanted.is_empty() {
            return Ok(());
        }

        let clashes = |other: &R| -> Option<StorageError> {
            if other.id() == candidate.id() {
                return None;
            }
            let taken = other.unique_fields();
            wanted
                .iter()
                .find(|field| taken.contains(*field))
                .map(|(field, value)| StorageError::unique_violation(*field, value.clone()))
        };

        for entry in self.data.iter() {
            if overlay.contains_key(entry.key()) {
                continue;
            }
            if let Some(err) = clashes(entry.value()) {
                return Err(err);
            }
        }
        for other in overlay.values().flatten() {
            if let Some(err) = clashes(other) {
                return Err(err);
            }
        }
        Ok(())
    }

    fn visible(&self, id: &R::Id, overlay: &HashMap<R::Id, Option<R>>) -> Option<R> {
        match overlay.get(id) {
            Some(staged) => staged.clone(),
            None => self.data.get(id).map(|r| r.value().clone()),
        }
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for InMemoryStore<R> {
    async fn get_by_id(&self, id: &R::Id) -> Result<Option<R>, StorageError> {
        Ok(self.inner.data.get(id).map(|r| r.value().clone()))
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<R>, StorageError> {
        Ok(self
            .inner
            .data
            .iter()
            .filter(|entry| entry.value().owner() == owner)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<R>, StorageError> {
        Ok(self
            .inner
            .data
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn save(&self, record: &R) -> Result<R, StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        self.inner.check_unique(record, &HashMap::new())?;
        self.inner.data.insert(record.id().clone(), record.clone());
        debug!(kind = R::KIND, id = %record.id(), "Saved record");
        Ok(record.clone())
    }

    async fn delete_by_id(&self, id: &R::Id) -> Result<DeleteOutcome, StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        let outcome = match self.inner.data.remove(id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        };
        debug!(kind = R::KIND, id = %id, ?outcome, "Deleted record");
        Ok(outcome)
    }

    async fn next_id(&self) -> Result<R::Id, StorageError> {
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        Ok(R::Id::generate(sequence))
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction<R>>, StorageError> {
        Ok(Box::new(MemoryTransaction {
            store: self.inner.clone(),
            staged: Vec::new(),
            overlay: HashMap::new(),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl<R: Record> std::fmt::Debug for InMemoryStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("kind", &R::KIND)
            .field("records", &self.len())
            .finish()
    }
}

// ============================================================================
// Transactions
// ============================================================================

enum StagedOp<R: Record> {
    Save(R),
    Delete(R::Id),
}

/// Transaction over an [`InMemoryStore`]. Writes are staged and applied
/// all-or-nothing on commit; dropping it is equivalent to rollback.
struct MemoryTransaction<R: Record> {
    store: Arc<StoreInner<R>>,
    staged: Vec<StagedOp<R>>,
    /// Latest staged state per id, for reads inside the transaction.
    overlay: HashMap<R::Id, Option<R>>,
}

#[async_trait]
impl<R: Record> Transaction<R> for MemoryTransaction<R> {
    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let MemoryTransaction {
            store,
            staged,
            overlay,
        } = *self;

        let _guard = store.write_lock.lock().await;
        for candidate in overlay.values().flatten() {
            store.check_unique(candidate, &overlay)?;
        }

        let operations = staged.len();
        for op in staged {
            match op {
                StagedOp::Save(record) => {
                    store.data.insert(record.id().clone(), record);
                }
                StagedOp::Delete(id) => {
                    store.data.remove(&id);
                }
            }
        }
        debug!(kind = R::KIND, operations, "Committed transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        debug!(kind = R::KIND, operations = self.staged.len(), "Rolled back transaction");
        Ok(())
    }

    async fn save(&mut self, record: &R) -> Result<R, StorageError> {
        self.overlay
            .insert(record.id().clone(), Some(record.clone()));
        self.staged.push(StagedOp::Save(record.clone()));
        Ok(record.clone())
    }

    async fn delete(&mut self, id: &R::Id) -> Result<DeleteOutcome, StorageError> {
        if self.store.visible(id, &self.overlay).is_none() {
            return Ok(DeleteOutcome::NotFound);
        }
        self.overlay.insert(id.clone(), None);
        self.staged.push(StagedOp::Delete(id.clone()));
        Ok(DeleteOutcome::Deleted)
    }

    async fn get(&self, id: &R::Id) -> Result<Option<R>, StorageError> {
        Ok(self.store.visible(id, &self.overlay))
    }
}
