//! Concurrent fan-out of one change across a subject's dependent records.
//!
//! `apply_to_all` discovers the records owned by a subject key on the
//! discovery pool, then writes each one as its own task on the apply pool.
//! A failed (or panicking) write is logged at that record's boundary and
//! never affects its siblings. The caller gets a [`CompletionHandle`] that
//! moves from `Running` to `Settled` once every write has finished,
//! whatever the outcomes.
//!
//! Each write re-reads its record first, so it applies on top of the latest
//! stored state. A record deleted after discovery is skipped, not recreated.
//!
//! Per-record lifecycle: `Pending -> Applied | Failed | Skipped`.

use std::sync::Arc;

use orderlink_core::WorkerPool;
use orderlink_storage::{DynStore, Record};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::RecordCache;

/// State of one fan-out run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutState {
    Running,
    Settled,
}

/// Final state of one record's write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Applied,
    Failed,
    /// Gone by the time its write ran.
    Skipped,
}

/// Observes a fan-out run. Carries no aggregate success status.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    subject: Arc<str>,
    state: watch::Receiver<FanoutState>,
}

impl CompletionHandle {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn state(&self) -> FanoutState {
        *self.state.borrow()
    }

    pub fn is_settled(&self) -> bool {
        self.state() == FanoutState::Settled
    }

    /// Wait until every per-record write has settled.
    ///
    /// Also returns if the run was abandoned because its pool shut down.
    pub async fn settled(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == FanoutState::Settled).await;
    }
}

/// Applies a mutation to every record owned by a subject key.
pub struct FanoutUpdater<R: Record> {
    store: DynStore<R>,
    cache: Arc<RecordCache<R>>,
    discovery: Arc<WorkerPool>,
    apply: Arc<WorkerPool>,
    in_flight: Option<Arc<Semaphore>>,
}

impl<R: Record> FanoutUpdater<R> {
    pub fn new(
        store: DynStore<R>,
        cache: Arc<RecordCache<R>>,
        discovery: Arc<WorkerPool>,
        apply: Arc<WorkerPool>,
    ) -> Self {
        Self {
            store,
            cache,
            discovery,
            apply,
            in_flight: None,
        }
    }

    /// Cap the number of writes in flight at once.
    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.in_flight = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Start applying `mutation` to every record owned by `subject_key`.
    ///
    /// Returns immediately. After a record's write succeeds its cache entry
    /// is written through; after a failure the cache is left alone.
    pub fn apply_to_all<F>(&self, subject_key: impl Into<String>, mutation: F) -> CompletionHandle
    where
        F: Fn(&mut R) + Send + Sync + 'static,
    {
        let subject: Arc<str> = Arc::from(subject_key.into());
        let (state_tx, state_rx) = watch::channel(FanoutState::Running);

        let run = FanoutRun {
            subject: subject.clone(),
            store: self.store.clone(),
            cache: self.cache.clone(),
            apply: self.apply.clone(),
            in_flight: self.in_flight.clone(),
            mutation: Arc::new(mutation),
        };
        self.discovery.spawn(async move {
            run.execute().await;
            state_tx.send_replace(FanoutState::Settled);
        });

        CompletionHandle {
            subject,
            state: state_rx,
        }
    }
}

impl<R: Record> std::fmt::Debug for FanoutUpdater<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutUpdater")
            .field("kind", &R::KIND)
            .field("discovery", &self.discovery)
            .field("apply", &self.apply)
            .field("bounded", &self.in_flight.is_some())
            .finish()
    }
}

// ============================================================================
// One run
// ============================================================================

struct FanoutRun<R: Record, F> {
    subject: Arc<str>,
    store: DynStore<R>,
    cache: Arc<RecordCache<R>>,
    apply: Arc<WorkerPool>,
    in_flight: Option<Arc<Semaphore>>,
    mutation: Arc<F>,
}

impl<R, F> FanoutRun<R, F>
where
    R: Record,
    F: Fn(&mut R) + Send + Sync + 'static,
{
    async fn execute(self) {
        let records = match self.store.list_by_owner(&self.subject).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    kind = R::KIND,
                    subject = %self.subject,
                    error = %e,
                    "Fan-out discovery failed, nothing applied"
                );
                return;
            }
        };

        let total = records.len();
        debug!(kind = R::KIND, subject = %self.subject, records = total, "Fan-out started");

        let mut tasks = JoinSet::new();
        for record in records {
            let id = record.id().clone();
            debug!(kind = R::KIND, id = %id, "Fan-out record pending");
            tasks.spawn_on(
                apply_one(
                    id,
                    self.store.clone(),
                    self.cache.clone(),
                    self.in_flight.clone(),
                    self.mutation.clone(),
                ),
                self.apply.handle(),
            );
        }

        let (mut applied, mut failed, mut skipped) = (0usize, 0usize, 0usize);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(RecordOutcome::Applied) => applied += 1,
                Ok(RecordOutcome::Failed) => failed += 1,
                Ok(RecordOutcome::Skipped) => skipped += 1,
                Err(join_err) => {
                    failed += 1;
                    error!(
                        kind = R::KIND,
                        subject = %self.subject,
                        error = %join_err,
                        "Fan-out write task panicked"
                    );
                }
            }
        }

        info!(
            kind = R::KIND,
            subject = %self.subject,
            total,
            applied,
            failed,
            skipped,
            "Fan-out settled"
        );
    }
}

async fn apply_one<R, F>(
    id: R::Id,
    store: DynStore<R>,
    cache: Arc<RecordCache<R>>,
    in_flight: Option<Arc<Semaphore>>,
    mutation: Arc<F>,
) -> RecordOutcome
where
    R: Record,
    F: Fn(&mut R) + Send + Sync + 'static,
{
    let _permit = match in_flight {
        Some(limit) => limit.acquire_owned().await.ok(),
        None => None,
    };

    let mut record = match store.get_by_id(&id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!(kind = R::KIND, id = %id, "Fan-out record gone, skipped");
            return RecordOutcome::Skipped;
        }
        Err(e) => {
            warn!(
                kind = R::KIND,
                id = %id,
                error = %e,
                category = %e.category(),
                "Fan-out record reload failed, left unchanged"
            );
            return RecordOutcome::Failed;
        }
    };

    mutation(&mut record);
    match store.save(&record).await {
        Ok(saved) => {
            cache.write_through(&saved);
            debug!(kind = R::KIND, id = %saved.id(), "Fan-out record applied");
            RecordOutcome::Applied
        }
        Err(e) => {
            warn!(
                kind = R::KIND,
                id = %record.id(),
                error = %e,
                category = %e.category(),
                "Fan-out record failed, left unchanged"
            );
            RecordOutcome::Failed
        }
    }
}
