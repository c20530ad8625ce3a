//! Bounded worker pool shared by the dispatcher and the source processor
//!
//! A [`BoundedPool`] is a semaphore-guarded task spawner. [`BoundedPool::spawn`]
//! waits for a free slot before the task is spawned, so the submitting loop is the
//! one that blocks when the pool is full, and the slot is released the moment the
//! task's future completes. [`BoundedPool::join`] waits for every spawned task.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Fixed-capacity pool of tokio tasks
pub struct BoundedPool<T> {
    /// One permit per slot
    slots: Arc<Semaphore>,
    /// Spawned tasks, drained by [`BoundedPool::join`]
    tasks: JoinSet<T>,
    /// Tasks currently holding a slot
    active: Arc<AtomicUsize>,
    /// Highest value `active` has reached
    peak: usize,
}

impl<T: Send + 'static> BoundedPool<T> {
    /// Create a pool that runs at most `capacity` tasks at once
    ///
    /// A capacity of zero is raised to one so the pool can always make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            tasks: JoinSet::new(),
            active: Arc::new(AtomicUsize::new(0)),
            peak: 0,
        }
    }

    /// Wait for a free slot, then spawn `task` on it
    ///
    /// The slot is held until `task` finishes (or panics).
    pub async fn spawn<F>(&mut self, task: F) -> Result<()>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak = self.peak.max(now);
        let slot = SlotGuard {
            _permit: permit,
            active: Arc::clone(&self.active),
        };

        self.tasks.spawn(async move {
            let _slot = slot;
            task.await
        });
        Ok(())
    }

    /// Wait for every spawned task and return their results in completion order
    ///
    /// A task that panicked shows up as an `Err(JoinError)`; the remaining tasks are
    /// still awaited.
    pub async fn join(mut self) -> Vec<std::result::Result<T, JoinError>> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = &result {
                tracing::error!(error = %e, "pooled task did not complete");
            }
            results.push(result);
        }
        results
    }

    /// Highest number of tasks that have held a slot at the same time so far
    pub fn peak(&self) -> usize {
        self.peak
    }
}

/// Releases the slot and the active count together, also on panic
struct SlotGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
