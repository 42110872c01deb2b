//! embedrt
//!
//! A guest runtime packaged as a library for a native host application
//! (typically an iOS app). The host calls a few C entry points; before any of
//! them does work, the runtime hardens itself so it stays out of the host's
//! way: aggressive collector pacing, a narrow worker pool with large stacks,
//! no competing fault-signal handlers, and no output on the host's streams.
//!
//! # Example
//!
//! ```no_run
//! use embedrt::{initialize, pre_initialize, RuntimeHardening};
//!
//! let config = RuntimeHardening::default();
//! pre_initialize(&config);
//! let report = initialize(&config);
//! assert_eq!(report.state, embedrt::InitState::Initialized);
//! ```

#![warn(rust_2018_idioms)]

pub mod bridge;
pub mod ffi;
pub mod hardening;
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use hardening::{
    ensure_initialized, ensure_initialized_with, initialize, pre_initialize, HardeningError,
    HardeningReport, InitState, PhaseReport, RuntimeHardening, Step, StepOutcome,
};
pub use runtime::signal::Signal;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "embedrt";
