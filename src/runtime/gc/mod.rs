//! Collector pacing
//!
//! The guest runtime starts a collection once the heap has grown by
//! `gc_percent` percent over the live heap left behind by the previous cycle.
//! The percentage is process-wide; a negative value disables triggering.

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// Trigger percentage the runtime starts with before any tuning.
pub const DEFAULT_GC_PERCENT: i32 = 100;

static GC_PERCENT: AtomicI32 = AtomicI32::new(DEFAULT_GC_PERCENT);

static PACER: Lazy<Mutex<GC>> = Lazy::new(|| Mutex::new(GC::default()));

/// Set the heap-growth trigger percentage, returning the previous value.
///
/// The process-wide pacer is retuned right away.
pub fn set_gc_percent(percent: i32) -> i32 {
    let previous = GC_PERCENT.swap(percent, Ordering::SeqCst);
    let mut pacer = PACER.lock();
    pacer.retune();
    debug!(
        "gc percent {} -> {}, next trigger {:?}",
        previous,
        percent,
        pacer.next_trigger()
    );
    previous
}

/// Current heap-growth trigger percentage.
pub fn gc_percent() -> i32 {
    GC_PERCENT.load(Ordering::SeqCst)
}

/// The process-wide pacer.
pub fn pacer() -> &'static Mutex<GC> {
    &PACER
}

/// Snapshot of the process-wide pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GcPacing {
    pub percent: i32,
    /// Heap size that starts the next cycle; `None` while disabled
    pub next_trigger: Option<usize>,
}

/// Current percentage and the trigger the process-wide pacer derived from it.
pub fn pacing() -> GcPacing {
    let pacer = PACER.lock();
    GcPacing {
        percent: pacer.percent,
        next_trigger: pacer.next_trigger(),
    }
}

/// GC configuration
#[derive(Debug, Clone)]
pub struct GCConfig {
    /// Heap floor at 100%, scaled by the trigger percentage
    pub min_heap_size: usize,
    /// Maximum pause time
    pub max_pause: Duration,
}

impl Default for GCConfig {
    fn default() -> Self {
        Self {
            min_heap_size: 4 * 1024 * 1024,
            max_pause: Duration::from_millis(10),
        }
    }
}

/// Heap size at which the next collection starts.
///
/// Returns `None` when collection is disabled (negative percentage).
pub fn trigger_for(
    live_heap: usize,
    percent: i32,
    min_heap_size: usize,
) -> Option<usize> {
    if percent < 0 {
        return None;
    }
    let percent = percent as u128;
    let growth = live_heap as u128 * percent / 100;
    let floor = min_heap_size as u128 * percent / 100;
    let trigger = (live_heap as u128 + growth).max(floor);
    Some(usize::try_from(trigger).unwrap_or(usize::MAX))
}

/// Collection pacer
#[derive(Debug)]
pub struct GC {
    /// Configuration
    config: GCConfig,
    /// Live heap after the last cycle
    live_heap: usize,
    /// Percentage the trigger was computed with
    percent: i32,
    /// Heap size that starts the next cycle
    trigger: Option<usize>,
    /// Completed cycles
    cycles: u64,
    /// Pause time tracking
    total_pause: Duration,
    last_pause: Duration,
}

impl GC {
    /// Create a new pacer using the current process-wide percentage
    pub fn new(config: GCConfig) -> Self {
        let percent = gc_percent();
        let trigger = trigger_for(0, percent, config.min_heap_size);
        Self {
            config,
            live_heap: 0,
            percent,
            trigger,
            cycles: 0,
            total_pause: Duration::ZERO,
            last_pause: Duration::ZERO,
        }
    }

    /// Recompute the trigger after the percentage changed
    pub fn retune(&mut self) {
        self.percent = gc_percent();
        self.trigger = trigger_for(self.live_heap, self.percent, self.config.min_heap_size);
    }

    /// Check if collection is needed
    pub fn should_collect(
        &self,
        heap_size: usize,
    ) -> bool {
        match self.trigger {
            Some(trigger) => heap_size >= trigger,
            None => false,
        }
    }

    /// Record a finished cycle and pace the next one
    pub fn record_collection(
        &mut self,
        live_heap: usize,
        pause: Duration,
    ) {
        self.live_heap = live_heap;
        self.cycles += 1;
        self.last_pause = pause;
        self.total_pause += pause;
        if pause > self.config.max_pause {
            debug!(
                "gc pause {:?} exceeded target {:?}",
                pause, self.config.max_pause
            );
        }
        self.retune();
    }

    /// Heap size that starts the next cycle
    pub fn next_trigger(&self) -> Option<usize> {
        self.trigger
    }

    /// Completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Get total pause time
    pub fn total_pause(&self) -> Duration {
        self.total_pause
    }

    /// Get last pause time
    pub fn last_pause(&self) -> Duration {
        self.last_pause
    }
}

impl Default for GC {
    fn default() -> Self {
        Self::new(GCConfig::default())
    }
}
