//! Standard-stream isolation
//!
//! Diagnostic output from the guest runtime, including anything written
//! while it is failing, must not reach the host's log capture. Standard
//! output and standard error are pointed at a discard target instead.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use tracing::debug;

use crate::hardening::HardeningError;

/// Discard target used unless configured otherwise.
pub const DEFAULT_DISCARD_PATH: &str = "/dev/null";

/// Point every descriptor in `fds` at `target`, opened write-only.
///
/// Nothing is redirected when `target` cannot be opened.
pub fn redirect_fds(
    target: &Path,
    fds: &[RawFd],
) -> Result<(), HardeningError> {
    let file = OpenOptions::new()
        .write(true)
        .open(target)
        .map_err(|source| HardeningError::OpenDiscard {
            path: target.to_path_buf(),
            source,
        })?;

    for &fd in fds {
        // SAFETY: both descriptors are valid; dup2 atomically replaces `fd`.
        if unsafe { libc::dup2(file.as_raw_fd(), fd) } < 0 {
            return Err(HardeningError::Redirect {
                fd,
                source: io::Error::last_os_error(),
            });
        }
        debug!("fd {} -> {}", fd, target.display());
    }
    Ok(())
}

/// Redirect standard output and standard error to `target`.
pub fn redirect_standard_streams(target: &Path) -> Result<(), HardeningError> {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    redirect_fds(target, &[libc::STDOUT_FILENO, libc::STDERR_FILENO])
}
