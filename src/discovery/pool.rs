//! Worker pool
//!
//! Bounded fire-and-forget execution for discovery tasks. Callers never get a
//! handle to a spawned task; the only completion signal is the in-flight
//! count, which [`WorkerPool::wait_idle`] uses to drain the pool before the
//! process exits.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};

pub const DEFAULT_MAX_WORKERS: usize = 8;

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    in_flight: Arc<watch::Sender<usize>>,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let (in_flight, _) = watch::channel(0);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            in_flight: Arc::new(in_flight),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Queue `work` and return immediately.
    ///
    /// The worker permit is acquired inside the spawned task, so a full pool
    /// delays the work, never the caller. Must be called within a tokio runtime.
    pub fn spawn<F>(&self, label: String, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.send_modify(|n| *n += 1);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _guard = guard;
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::error!("Worker pool closed before {} could start", label);
                return;
            };
            if AssertUnwindSafe(work).catch_unwind().await.is_err() {
                tracing::error!("Task {} panicked", label);
            }
        });
    }

    /// Number of spawned tasks that have not finished, queued ones included
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Resolve once no task is queued or running
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

/// Decrements the in-flight count on drop, including during a panic unwind
struct InFlightGuard(Arc<watch::Sender<usize>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}
