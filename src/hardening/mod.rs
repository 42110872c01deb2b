//! Embedded-runtime initializer
//!
//! Makes the guest runtime a well-behaved tenant of a host process it does
//! not control. Startup is split in two phases:
//!
//! ```text
//! pre_initialize()            native phase, before anything may install
//!   ├─ signal suppression     signal handlers
//!   └─ worker stacks
//! initialize()                managed phase (runs the native phase first
//!   ├─ gc tuning              if nobody did)
//!   ├─ concurrency width
//!   ├─ runtime signal ignore
//!   └─ stream isolation
//! ```
//!
//! Every step is best-effort and idempotent. A step that cannot be applied is
//! logged and recorded in the report; it never stops the sequence.

mod error;

pub use error::HardeningError;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runtime::gc;
use crate::runtime::scheduler;
use crate::runtime::signal::{self, Signal};
use crate::runtime::stdio;

/// Process-wide hardening settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeHardening {
    /// Heap-growth percentage that triggers a collection
    pub gc_percent: i32,
    /// Worker threads executing guest code; 0 keeps the runtime default
    pub max_procs: usize,
    /// Stack size for worker threads in bytes; 0 keeps the runtime default
    pub worker_stack_size: usize,
    /// Signals suppressed at runtime and native level
    pub signals: Vec<Signal>,
    /// Redirect standard output and error to `discard_path`
    pub redirect_streams: bool,
    pub discard_path: PathBuf,
}

impl Default for RuntimeHardening {
    fn default() -> Self {
        Self {
            gc_percent: 10,
            max_procs: 2,
            worker_stack_size: 16 * 1024 * 1024,
            signals: Signal::CRASH_SIGNALS.to_vec(),
            redirect_streams: true,
            discard_path: PathBuf::from(stdio::DEFAULT_DISCARD_PATH),
        }
    }
}

impl RuntimeHardening {
    /// Settings from the configuration file, or the defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        match crate::util::config::load_hardening_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("using default hardening: {}", e);
                Self::default()
            }
        }
    }
}

/// Initializer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InitState {
    Uninitialized = 0,
    Initialized = 1,
}

static STATE: AtomicU8 = AtomicU8::new(InitState::Uninitialized as u8);
static NATIVE_PHASE_DONE: AtomicBool = AtomicBool::new(false);
static ONCE: OnceCell<HardeningReport> = OnceCell::new();

/// Current initializer state.
pub fn state() -> InitState {
    match STATE.load(Ordering::SeqCst) {
        0 => InitState::Uninitialized,
        _ => InitState::Initialized,
    }
}

/// A single mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    NativeSignals,
    WorkerStacks,
    GcTuning,
    ConcurrencyWidth,
    RuntimeSignals,
    StreamIsolation,
}

/// What happened to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Applied,
    Skipped { reason: String },
    Failed { error: String },
}

impl StepOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Outcomes of one phase, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub steps: Vec<StepReport>,
}

impl PhaseReport {
    fn record(
        &mut self,
        step: Step,
        result: Result<StepOutcome, HardeningError>,
    ) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{:?} failed: {}", step, e);
                StepOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        if let StepOutcome::Skipped { reason } = &outcome {
            debug!("{:?} skipped: {}", step, reason);
        }
        self.steps.push(StepReport { step, outcome });
    }

    /// Outcome of `step`, if it ran in this phase.
    pub fn outcome(
        &self,
        step: Step,
    ) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|report| report.step == step)
            .map(|report| &report.outcome)
    }

    /// Steps that were skipped or failed.
    pub fn not_applied(&self) -> usize {
        self.steps
            .iter()
            .filter(|report| !report.outcome.is_applied())
            .count()
    }
}

/// Outcome of a full initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardeningReport {
    /// Present when native steps ran as part of this call.
    pub native: Option<PhaseReport>,
    pub managed: PhaseReport,
    /// Collector pacing after tuning.
    pub gc: gc::GcPacing,
    pub state: InitState,
}

impl HardeningReport {
    /// Outcome of `step` in either phase.
    pub fn outcome(
        &self,
        step: Step,
    ) -> Option<&StepOutcome> {
        self.native
            .as_ref()
            .and_then(|phase| phase.outcome(step))
            .or_else(|| self.managed.outcome(step))
    }

    /// Steps that were skipped or failed.
    pub fn not_applied(&self) -> usize {
        self.native.as_ref().map_or(0, PhaseReport::not_applied) + self.managed.not_applied()
    }
}

// ============================================================================
// Native phase
// ============================================================================

/// Native phase: ignore fault signals at process level and size worker
/// stacks. Run it before anything that may install signal handlers.
pub fn pre_initialize(config: &RuntimeHardening) -> PhaseReport {
    let mut report = PhaseReport::default();
    report.record(Step::NativeSignals, suppress_native_signals(&config.signals));
    report.record(Step::WorkerStacks, Ok(size_worker_stacks(config.worker_stack_size)));
    NATIVE_PHASE_DONE.store(true, Ordering::SeqCst);
    report
}

fn suppress_native_signals(signals: &[Signal]) -> Result<StepOutcome, HardeningError> {
    if signals.is_empty() {
        return Ok(StepOutcome::skipped("no signals configured"));
    }
    let mut first_error = None;
    for &sig in signals {
        if let Err(e) = signal::ignore_native(sig) {
            // keep going; one signal failing does not protect the others
            warn!("{}", e);
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(StepOutcome::Applied),
    }
}

fn size_worker_stacks(bytes: usize) -> StepOutcome {
    if bytes == 0 {
        return StepOutcome::skipped("stack size 0 keeps the runtime default");
    }
    scheduler::set_worker_stack_size(bytes);
    StepOutcome::Applied
}

// ============================================================================
// Managed phase
// ============================================================================

/// Apply every mitigation, running the native phase first if it has not run.
/// Configured signals an earlier native phase did not ignore are ignored
/// natively here.
pub fn initialize(config: &RuntimeHardening) -> HardeningReport {
    let native = if !NATIVE_PHASE_DONE.load(Ordering::SeqCst) {
        Some(pre_initialize(config))
    } else {
        // an earlier native phase may have covered fewer signals
        let covered = signal::natively_ignored();
        let missing: Vec<Signal> = config
            .signals
            .iter()
            .copied()
            .filter(|sig| !covered.contains(sig.number()))
            .collect();
        if missing.is_empty() {
            None
        } else {
            let mut phase = PhaseReport::default();
            phase.record(Step::NativeSignals, suppress_native_signals(&missing));
            Some(phase)
        }
    };

    let mut managed = PhaseReport::default();

    gc::set_gc_percent(config.gc_percent);
    let pacing = gc::pacing();
    managed.record(Step::GcTuning, Ok(StepOutcome::Applied));

    managed.record(Step::ConcurrencyWidth, limit_concurrency(config.max_procs));

    signal::ignore(&config.signals);
    managed.record(Step::RuntimeSignals, Ok(StepOutcome::Applied));

    managed.record(Step::StreamIsolation, isolate_streams(config));

    STATE.store(InitState::Initialized as u8, Ordering::SeqCst);

    let report = HardeningReport {
        native,
        managed,
        gc: pacing,
        state: InitState::Initialized,
    };
    info!(
        "runtime hardened ({} steps not applied)",
        report.not_applied()
    );
    report
}

fn limit_concurrency(max_procs: usize) -> Result<StepOutcome, HardeningError> {
    if max_procs == 0 {
        return Ok(StepOutcome::skipped("max_procs 0 keeps the runtime default"));
    }
    scheduler::set_max_procs(max_procs);
    // build the pool now so workers exist before the host calls in
    scheduler::global_pool()?;
    Ok(StepOutcome::Applied)
}

fn isolate_streams(config: &RuntimeHardening) -> Result<StepOutcome, HardeningError> {
    if !config.redirect_streams {
        return Ok(StepOutcome::skipped("disabled"));
    }
    match stdio::redirect_standard_streams(&config.discard_path) {
        Ok(()) => Ok(StepOutcome::Applied),
        Err(e @ HardeningError::OpenDiscard { .. }) => Ok(StepOutcome::skipped(e.to_string())),
        Err(e) => Err(e),
    }
}

/// Initialize with the loaded configuration, exactly once per process.
///
/// Every exported entry point calls this before doing any work.
pub fn ensure_initialized() -> &'static HardeningReport {
    ONCE.get_or_init(|| initialize(&RuntimeHardening::load()))
}

/// Like [`ensure_initialized`], with explicit settings instead of the
/// configuration file. Has no effect once the process is initialized.
pub fn ensure_initialized_with(config: &RuntimeHardening) -> &'static HardeningReport {
    ONCE.get_or_init(|| initialize(config))
}
