//! Worker pool for guest code
//!
//! Guest tasks run on a process-wide pool whose width is capped by
//! `max_procs`. The cap only covers threads executing guest code: the host's
//! threads, and the thread that calls into the library, are never counted.

pub mod group;

pub use group::TaskGroup;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::hardening::HardeningError;

/// Stack size given to worker threads unless tuned otherwise.
pub const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// 0 means "not set": fall back to the machine's parallelism.
static MAX_PROCS: AtomicUsize = AtomicUsize::new(0);
static WORKER_STACK_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_STACK_SIZE);

static GLOBAL_POOL: Lazy<RwLock<Option<Arc<WorkerPool>>>> = Lazy::new(|| RwLock::new(None));

fn available_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Set the number of worker threads executing guest code, returning the
/// previous value. Values below 1 leave the setting unchanged.
pub fn set_max_procs(n: usize) -> usize {
    let previous = max_procs();
    if n >= 1 {
        MAX_PROCS.store(n, Ordering::SeqCst);
        debug!("max procs {} -> {}", previous, n);
    }
    previous
}

/// Number of worker threads executing guest code.
pub fn max_procs() -> usize {
    match MAX_PROCS.load(Ordering::SeqCst) {
        0 => available_parallelism(),
        n => n,
    }
}

/// Set the worker stack size in bytes, returning the previous value.
pub fn set_worker_stack_size(bytes: usize) -> usize {
    let previous = WORKER_STACK_SIZE.swap(bytes, Ordering::SeqCst);
    debug!("worker stack size {} -> {}", previous, bytes);
    previous
}

/// Stack size in bytes for worker threads.
pub fn worker_stack_size() -> usize {
    WORKER_STACK_SIZE.load(Ordering::SeqCst)
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of worker threads.
    pub num_workers: usize,
    /// Worker thread stack size.
    pub default_stack_size: usize,
}

impl SchedulerConfig {
    /// Configuration reflecting the current process-wide settings.
    pub fn current() -> Self {
        Self {
            num_workers: max_procs(),
            default_stack_size: worker_stack_size(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: available_parallelism(),
            default_stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Scheduler statistics.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// Total tasks scheduled.
    pub tasks_scheduled: AtomicUsize,
    /// Total tasks completed.
    pub tasks_completed: AtomicUsize,
    /// Tasks currently executing.
    pub running: AtomicUsize,
    /// Peak number of running tasks.
    pub peak_parallelism: AtomicUsize,
}

impl SchedulerStats {
    /// Record a scheduled task.
    #[inline]
    pub fn record_scheduled(&self) {
        self.tasks_scheduled.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a task starting.
    #[inline]
    pub fn record_started(&self) {
        let current = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.update_parallelism(current);
    }

    /// Record a completed task.
    #[inline]
    pub fn record_completed(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.tasks_completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Update parallelism.
    #[inline]
    pub fn update_parallelism(
        &self,
        current: usize,
    ) {
        self.peak_parallelism.fetch_max(current, Ordering::SeqCst);
    }
}

/// Fixed-width pool of worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    /// Configuration.
    config: SchedulerConfig,
    /// Underlying threads.
    pool: rayon::ThreadPool,
    /// Statistics.
    stats: SchedulerStats,
}

impl WorkerPool {
    /// Build a pool with the given width and stack size.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, HardeningError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_workers.max(1))
            .stack_size(config.default_stack_size)
            .thread_name(|index| format!("embedrt-worker-{}", index))
            .build()?;
        debug!(
            "worker pool ready: {} threads, {} byte stacks",
            config.num_workers, config.default_stack_size
        );
        Ok(Self {
            config,
            pool,
            stats: SchedulerStats::default(),
        })
    }

    /// Configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Statistics.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub(crate) fn rayon(&self) -> &rayon::ThreadPool {
        &self.pool
    }
}

/// The process-wide pool, rebuilt when `max_procs` or the stack size changed
/// since it was last built.
pub fn global_pool() -> Result<Arc<WorkerPool>, HardeningError> {
    let wanted = SchedulerConfig::current();
    if let Some(pool) = GLOBAL_POOL.read().as_ref() {
        if pool.config == wanted {
            return Ok(pool.clone());
        }
    }

    let mut slot = GLOBAL_POOL.write();
    if let Some(pool) = slot.as_ref() {
        if pool.config == wanted {
            return Ok(pool.clone());
        }
    }
    let pool = Arc::new(WorkerPool::with_config(wanted)?);
    *slot = Some(pool.clone());
    Ok(pool)
}
