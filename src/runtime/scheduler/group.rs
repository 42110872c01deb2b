//! Fan-out / fan-in task group
//!
//! Spawns a fixed number of independent tasks on a [`WorkerPool`] and joins
//! on exactly that many results. Tasks share no mutable state; each reports
//! through its own clone of the completion channel.

use std::sync::Arc;

use crossbeam::channel;
use tracing::trace;

use super::{global_pool, WorkerPool};
use crate::hardening::HardeningError;

/// A group of tasks joined on completion count.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    pool: Arc<WorkerPool>,
}

impl TaskGroup {
    /// Create a group spawning onto `pool`.
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }

    /// Create a group on the process-wide pool.
    pub fn on_global() -> Result<Self, HardeningError> {
        Ok(Self::new(global_pool()?))
    }

    /// Pool the group spawns onto.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Run `task(id)` for every `id` in `1..=count` and return the `count`
    /// results in completion order.
    pub fn run<T, F>(
        &self,
        count: usize,
        task: F,
    ) -> Vec<T>
    where
        F: Fn(usize) -> T + Sync,
        T: Send,
    {
        let (tx, rx) = channel::unbounded();
        let stats = self.pool.stats();
        let task = &task;

        self.pool.rayon().scope(|scope| {
            for id in 1..=count {
                let tx = tx.clone();
                stats.record_scheduled();
                scope.spawn(move |_| {
                    stats.record_started();
                    let result = task(id);
                    stats.record_completed();
                    // receiver outlives the scope
                    let _ = tx.send(result);
                });
            }
        });
        drop(tx);

        let results: Vec<T> = rx.iter().collect();
        debug_assert_eq!(results.len(), count);
        trace!("task group joined {} results", results.len());
        results
    }
}
