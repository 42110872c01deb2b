//! Errors raised by hardening steps

use std::io;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

use libc::c_int;

use crate::runtime::signal::Signal;

/// A mitigation step that could not be applied.
///
/// These never reach the host: they are logged and recorded in the
/// [`HardeningReport`](super::HardeningReport).
#[derive(Debug, thiserror::Error)]
pub enum HardeningError {
    #[error("cannot open discard target {}: {source}", path.display())]
    OpenDiscard {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot redirect fd {fd}: {source}")]
    Redirect {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    #[error("cannot ignore {signal}: {source}")]
    Signal {
        signal: Signal,
        #[source]
        source: io::Error,
    },

    #[error("signal number {0} out of range")]
    InvalidSignal(c_int),

    #[error("worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
