//! EventedTransaction - a transaction wrapper that publishes domain events
//! only after the inner transaction commits.
//!
//! # Example
//!
//! ```ignore
//! let mut tx = EventedTransaction::begin(store.as_ref(), publisher.clone()).await?;
//! let saved = tx.save(&user).await?;
//! tx.queue_event(DomainEvent::updated(saved.id, &saved.username, &saved.email));
//! tx.commit().await?; // event is published here, after the commit
//! ```

use orderlink_core::events::{DomainEvent, EventPublisher};
use tracing::{debug, error};

use crate::error::StorageError;
use crate::traits::{DeleteOutcome, Record, RecordStore, Transaction};

/// What happened to the queued events of a committed transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub published: usize,
    /// Events lost because the broker refused them after the commit.
    pub failed: usize,
}

/// A transaction wrapper that collects events and publishes them on commit.
///
/// Rollback, a failed commit, or dropping the wrapper publishes nothing.
/// A publish failure after a successful commit is logged and reported in
/// [`CommitReport`] but does not fail the commit: the mutation is durable and
/// there is no outbox to retry from.
pub struct EventedTransaction<R: Record> {
    inner: Box<dyn Transaction<R>>,
    publisher: EventPublisher,
    /// Pending events to publish on commit.
    pending_events: Vec<DomainEvent>,
}

impl<R: Record> EventedTransaction<R> {
    /// Wrap an already-open transaction.
    pub fn new(inner: Box<dyn Transaction<R>>, publisher: EventPublisher) -> Self {
        Self {
            inner,
            publisher,
            pending_events: Vec::new(),
        }
    }

    /// Open a transaction on `store` and wrap it.
    pub async fn begin(
        store: &dyn RecordStore<R>,
        publisher: EventPublisher,
    ) -> Result<Self, StorageError> {
        let inner = store.begin_transaction().await?;
        Ok(Self::new(inner, publisher))
    }

    /// Queue an event to be published on commit.
    pub fn queue_event(&mut self, event: DomainEvent) {
        self.pending_events.push(event);
    }

    pub fn pending(&self) -> &[DomainEvent] {
        &self.pending_events
    }

    pub async fn save(&mut self, record: &R) -> Result<R, StorageError> {
        self.inner.save(record).await
    }

    pub async fn delete(&mut self, id: &R::Id) -> Result<DeleteOutcome, StorageError> {
        self.inner.delete(id).await
    }

    pub async fn get(&self, id: &R::Id) -> Result<Option<R>, StorageError> {
        self.inner.get(id).await
    }

    /// Commit, then publish every queued event in order.
    pub async fn commit(self) -> Result<CommitReport, StorageError> {
        let EventedTransaction {
            inner,
            publisher,
            pending_events,
        } = self;

        // Nothing is published unless the commit succeeded.
        inner.commit().await?;

        let mut report = CommitReport::default();
        for event in pending_events {
            match publisher.publish(&event).await {
                Ok(()) => report.published += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        topic = %publisher.topic(),
                        kind = %event.kind,
                        entity_id = event.entity_id,
                        error = %e,
                        "Event lost after commit"
                    );
                }
            }
        }
        debug!(
            published = report.published,
            failed = report.failed,
            "Published pending transaction events"
        );

        Ok(report)
    }

    /// Roll back. Queued events are discarded.
    pub async fn rollback(self) -> Result<(), StorageError> {
        let discarded = self.pending_events.len();
        self.inner.rollback().await?;
        debug!(discarded, "Rolled back transaction, events discarded");
        Ok(())
    }
}

impl<R: Record> std::fmt::Debug for EventedTransaction<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedTransaction")
            .field("kind", &R::KIND)
            .field("pending_events", &self.pending_events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, User};
    use async_trait::async_trait;
    use orderlink_core::events::InProcessBroker;
    use std::sync::{Arc, Mutex};

    /// Records staged writes and applies them to a shared Vec on commit.
    struct VecTransaction {
        committed: Arc<Mutex<Vec<User>>>,
        staged: Vec<User>,
        fail_commit: bool,
    }

    #[async_trait]
    impl Transaction<User> for VecTransaction {
        async fn commit(self: Box<Self>) -> Result<(), StorageError> {
            if self.fail_commit {
                return Err(StorageError::transaction_error("commit refused"));
            }
            self.committed.lock().unwrap().extend(self.staged);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
            Ok(())
        }

        async fn save(&mut self, record: &User) -> Result<User, StorageError> {
            self.staged.push(record.clone());
            Ok(record.clone())
        }

        async fn delete(&mut self, _id: &i64) -> Result<DeleteOutcome, StorageError> {
            Ok(DeleteOutcome::NotFound)
        }

        async fn get(&self, id: &i64) -> Result<Option<User>, StorageError> {
            Ok(self.staged.iter().find(|u| u.id == *id).cloned())
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            address: Address::default(),
        }
    }

    fn setup(fail_commit: bool) -> (
        EventedTransaction<User>,
        Arc<Mutex<Vec<User>>>,
        tokio::sync::broadcast::Receiver<orderlink_core::events::BrokerRecord>,
    ) {
        let broker = InProcessBroker::new_shared(16);
        let rx = broker.subscribe("user-events");
        let publisher = EventPublisher::new(broker, "user-events");
        let committed = Arc::new(Mutex::new(Vec::new()));
        let inner = Box::new(VecTransaction {
            committed: committed.clone(),
            staged: Vec::new(),
            fail_commit,
        });
        (EventedTransaction::new(inner, publisher), committed, rx)
    }

    #[tokio::test]
    async fn test_events_published_after_commit() {
        let (mut tx, committed, mut rx) = setup(false);
        tx.save(&user(1)).await.unwrap();
        tx.queue_event(DomainEvent::updated(1, "alice", "alice@example.com"));
        assert!(rx.try_recv().is_err());

        let report = tx.commit().await.unwrap();
        assert_eq!(report, CommitReport { published: 1, failed: 0 });
        assert_eq!(committed.lock().unwrap().len(), 1);
        assert_eq!(rx.recv().await.unwrap().key, "1");
    }

    #[tokio::test]
    async fn test_rollback_publishes_nothing() {
        let (mut tx, committed, mut rx) = setup(false);
        tx.save(&user(1)).await.unwrap();
        tx.queue_event(DomainEvent::updated(1, "alice", "alice@example.com"));
        tx.rollback().await.unwrap();

        assert!(committed.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_commit_publishes_nothing() {
        let (mut tx, _committed, mut rx) = setup(true);
        tx.queue_event(DomainEvent::created(1, "alice", "alice@example.com"));
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, StorageError::TransactionError { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transaction_reads_staged_writes() {
        let (mut tx, _committed, _rx) = setup(false);
        tx.save(&user(4)).await.unwrap();
        assert_eq!(tx.get(&4).await.unwrap().map(|u| u.id), Some(4));
        assert_eq!(tx.pending().len(), 0);
    }
}
