//! Guest runtime
//!
//! Process-wide parameters of the runtime that executes guest work inside the
//! host: collector pacing, worker width and stacks, signal suppression and
//! standard-stream isolation.

pub mod gc;
pub mod scheduler;
pub mod signal;
pub mod stdio;
