//! Shadow signal table
//!
//! The signal API the guest runtime goes through. Requests are recorded in
//! process-local tables and never reach the kernel, with one exception: an
//! action requested for a signal the runtime ignores is turned into a native
//! ignore, so the host's own handler is never replaced by a runtime one.

use libc::c_int;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{ignore_native, is_ignored, Signal, SignalSet};
use crate::hardening::HardeningError;

/// Signal numbers tracked by the table are `1..MAX_SIGNALS`.
pub const MAX_SIGNALS: c_int = 32;

static SHADOW: Lazy<Mutex<ShadowSignalTable>> = Lazy::new(|| Mutex::new(ShadowSignalTable::new()));

/// The process-wide shadow table.
pub fn shadow_table() -> &'static Mutex<ShadowSignalTable> {
    &SHADOW
}

/// What happens when a signal arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disposition {
    #[default]
    Default,
    Ignore,
    /// Address of a handler function.
    Handler(usize),
}

/// A recorded `sigaction` request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowAction {
    pub disposition: Disposition,
    /// Signals blocked while the handler runs.
    pub mask: SignalSet,
    pub flags: c_int,
}

impl ShadowAction {
    pub fn new(disposition: Disposition) -> Self {
        Self {
            disposition,
            ..Self::default()
        }
    }
}

/// How `sigprocmask` combines the new set with the current mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskHow {
    Block,
    Unblock,
    SetMask,
}

/// A recorded alternate signal stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AltStack {
    pub base: usize,
    pub size: usize,
    pub flags: c_int,
}

/// Virtualised signal state of the guest runtime.
#[derive(Debug)]
pub struct ShadowSignalTable {
    actions: [ShadowAction; MAX_SIGNALS as usize],
    mask: SignalSet,
    altstack: Option<AltStack>,
}

impl ShadowSignalTable {
    pub fn new() -> Self {
        Self {
            actions: [ShadowAction::default(); MAX_SIGNALS as usize],
            mask: SignalSet::empty(),
            altstack: None,
        }
    }

    /// Record `new` as the action for `number`, returning the previous one.
    ///
    /// When the runtime ignores the signal, the native disposition is set to
    /// ignore instead of installing anything.
    pub fn sigaction(
        &mut self,
        number: c_int,
        new: Option<ShadowAction>,
    ) -> Result<ShadowAction, HardeningError> {
        if !(1..MAX_SIGNALS).contains(&number) {
            return Err(HardeningError::InvalidSignal(number));
        }
        let slot = &mut self.actions[number as usize];
        let old = *slot;

        if let Some(action) = new {
            *slot = action;
            if let Some(signal) = Signal::from_number(number) {
                if is_ignored(signal) {
                    debug!("{} handler request diverted to SIG_IGN", signal);
                    if let Err(e) = ignore_native(signal) {
                        warn!("{}", e);
                    }
                }
            }
        }
        Ok(old)
    }

    /// Update the virtual signal mask, returning the previous one.
    pub fn sigprocmask(
        &mut self,
        how: MaskHow,
        set: Option<SignalSet>,
    ) -> SignalSet {
        let old = self.mask;
        if let Some(set) = set {
            self.mask = match how {
                MaskHow::Block => self.mask.union(set),
                MaskHow::Unblock => self.mask.difference(set),
                MaskHow::SetMask => set,
            };
        }
        old
    }

    /// Record an alternate signal stack, returning the previous one.
    pub fn sigaltstack(
        &mut self,
        new: Option<AltStack>,
    ) -> Option<AltStack> {
        let old = self.altstack;
        if new.is_some() {
            self.altstack = new;
        }
        old
    }

    /// Virtual signal mask.
    pub fn mask(&self) -> SignalSet {
        self.mask
    }
}

impl Default for ShadowSignalTable {
    fn default() -> Self {
        Self::new()
    }
}
