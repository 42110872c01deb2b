//! Signal suppression
//!
//! The guest runtime must not compete with the host for fault signals. The
//! host (and the OS crash reporter behind it) owns them; the runtime only
//! ever ignores them.
//!
//! Suppression happens on two levels:
//!
//! - runtime level: the signal is recorded as ignored, and any later attempt
//!   by the runtime to install a handler for it goes through
//!   [`ShadowSignalTable`], which ignores the signal instead
//! - native level: the process disposition is set to `SIG_IGN`

pub mod shadow;

pub use shadow::{
    shadow_table, AltStack, Disposition, MaskHow, ShadowAction, ShadowSignalTable, MAX_SIGNALS,
};

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use libc::c_int;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::hardening::HardeningError;

/// Signals the guest runtime would otherwise install handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "SIGBUS")]
    Bus,
    #[serde(rename = "SIGPIPE")]
    Pipe,
    #[serde(rename = "SIGSEGV")]
    Segv,
    #[serde(rename = "SIGABRT")]
    Abrt,
    #[serde(rename = "SIGILL")]
    Ill,
    #[serde(rename = "SIGFPE")]
    Fpe,
    #[serde(rename = "SIGTRAP")]
    Trap,
}

impl Signal {
    /// Every signal suppressed by default.
    pub const CRASH_SIGNALS: [Signal; 7] = [
        Signal::Bus,
        Signal::Pipe,
        Signal::Segv,
        Signal::Abrt,
        Signal::Ill,
        Signal::Fpe,
        Signal::Trap,
    ];

    /// Platform signal number.
    pub fn number(self) -> c_int {
        match self {
            Signal::Bus => libc::SIGBUS,
            Signal::Pipe => libc::SIGPIPE,
            Signal::Segv => libc::SIGSEGV,
            Signal::Abrt => libc::SIGABRT,
            Signal::Ill => libc::SIGILL,
            Signal::Fpe => libc::SIGFPE,
            Signal::Trap => libc::SIGTRAP,
        }
    }

    /// Look up a signal by platform number.
    pub fn from_number(number: c_int) -> Option<Signal> {
        Self::CRASH_SIGNALS
            .iter()
            .copied()
            .find(|signal| signal.number() == number)
    }

    /// Conventional name, e.g. `SIGSEGV`.
    pub fn name(self) -> &'static str {
        match self {
            Signal::Bus => "SIGBUS",
            Signal::Pipe => "SIGPIPE",
            Signal::Segv => "SIGSEGV",
            Signal::Abrt => "SIGABRT",
            Signal::Ill => "SIGILL",
            Signal::Fpe => "SIGFPE",
            Signal::Trap => "SIGTRAP",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of signal numbers in `1..64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignalSet {
    bits: u64,
}

impl SignalSet {
    /// Empty set.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    fn bit(number: c_int) -> Option<u64> {
        if (1..64).contains(&number) {
            Some(1u64 << number)
        } else {
            None
        }
    }

    /// Add a signal number. Out-of-range numbers are ignored.
    pub fn insert(
        &mut self,
        number: c_int,
    ) {
        if let Some(bit) = Self::bit(number) {
            self.bits |= bit;
        }
    }

    /// Remove a signal number.
    pub fn remove(
        &mut self,
        number: c_int,
    ) {
        if let Some(bit) = Self::bit(number) {
            self.bits &= !bit;
        }
    }

    /// Check membership.
    pub fn contains(
        &self,
        number: c_int,
    ) -> bool {
        Self::bit(number).is_some_and(|bit| self.bits & bit != 0)
    }

    /// Add every member of `other`.
    pub fn union(
        self,
        other: SignalSet,
    ) -> SignalSet {
        SignalSet {
            bits: self.bits | other.bits,
        }
    }

    /// Remove every member of `other`.
    pub fn difference(
        self,
        other: SignalSet,
    ) -> SignalSet {
        SignalSet {
            bits: self.bits & !other.bits,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = c_int> + '_ {
        (1..64).filter(move |number| self.contains(*number))
    }
}

impl FromIterator<c_int> for SignalSet {
    fn from_iter<I: IntoIterator<Item = c_int>>(iter: I) -> Self {
        let mut set = SignalSet::empty();
        for number in iter {
            set.insert(number);
        }
        set
    }
}

impl<'a> FromIterator<&'a Signal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = &'a Signal>>(iter: I) -> Self {
        iter.into_iter().map(|signal| signal.number()).collect()
    }
}

// ============================================================================
// Runtime level
// ============================================================================

static RUNTIME_IGNORED: AtomicU64 = AtomicU64::new(0);

/// Mark signals as ignored by the guest runtime.
pub fn ignore(signals: &[Signal]) {
    let set: SignalSet = signals.iter().collect();
    RUNTIME_IGNORED.fetch_or(set.bits, Ordering::SeqCst);
    debug!("runtime ignores {} signals", set.len());
}

/// Whether the guest runtime ignores `signal`.
pub fn is_ignored(signal: Signal) -> bool {
    ignored().contains(signal.number())
}

/// Signals the guest runtime ignores.
pub fn ignored() -> SignalSet {
    SignalSet {
        bits: RUNTIME_IGNORED.load(Ordering::SeqCst),
    }
}

// ============================================================================
// Native level
// ============================================================================

static NATIVE_IGNORED: AtomicU64 = AtomicU64::new(0);

/// Signals this process has set to `SIG_IGN` through [`ignore_native`].
pub fn natively_ignored() -> SignalSet {
    SignalSet {
        bits: NATIVE_IGNORED.load(Ordering::SeqCst),
    }
}

fn query_native(number: c_int) -> io::Result<libc::sigaction> {
    // SAFETY: a null `act` only reads the current action into `old`.
    unsafe {
        let mut old: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(number, std::ptr::null(), &mut old) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(old)
    }
}

/// Set the process disposition of `signal` to ignore.
pub fn ignore_native(signal: Signal) -> Result<(), HardeningError> {
    // SAFETY: the action is fully initialised and installs no handler code.
    let rc = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = libc::SIG_IGN;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(signal.number(), &action, std::ptr::null_mut())
    };
    if rc != 0 {
        return Err(HardeningError::Signal {
            signal,
            source: io::Error::last_os_error(),
        });
    }
    let mut set = SignalSet::empty();
    set.insert(signal.number());
    NATIVE_IGNORED.fetch_or(set.bits, Ordering::SeqCst);
    trace!("{} -> SIG_IGN", signal);
    Ok(())
}

/// Current process disposition of `signal`.
pub fn native_disposition(signal: Signal) -> Result<Disposition, HardeningError> {
    let action = query_native(signal.number())
        .map_err(|source| HardeningError::Signal { signal, source })?;
    Ok(match action.sa_sigaction {
        libc::SIG_DFL => Disposition::Default,
        libc::SIG_IGN => Disposition::Ignore,
        handler => Disposition::Handler(handler),
    })
}

#[cfg(test)]
mod tests;
