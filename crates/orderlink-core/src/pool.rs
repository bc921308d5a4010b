//! Dedicated worker pools.
//!
//! A [`WorkerPool`] owns its own multi-thread tokio runtime, so work spawned on
//! it never competes with request handling on the main runtime. Pools are
//! created by the composition root and handed to the components that need
//! them; dropping a pool shuts its runtime down without blocking.

use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

/// An owned tokio runtime used as a named worker pool.
pub struct WorkerPool {
    name: String,
    threads: usize,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl WorkerPool {
    /// Build a pool with `threads` worker threads (at least one).
    pub fn new(name: impl Into<String>, threads: usize) -> std::io::Result<Self> {
        let name = name.into();
        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name(format!("{name}-worker"))
            .enable_all()
            .build()?;
        debug!(pool = %name, threads, "Worker pool started");
        Ok(Self {
            name,
            threads,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Handle for spawning onto this pool, e.g. with `JoinSet::spawn_on`.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn a future on this pool.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            debug!(pool = %self.name, "Worker pool shut down");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("threads", &self.threads)
            .finish()
    }
}
