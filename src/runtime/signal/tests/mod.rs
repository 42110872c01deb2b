//! Signal 单元测试
//!
//! 测试信号集合、运行时忽略表、进程级处置以及影子信号表

use crate::hardening::HardeningError;
use crate::runtime::signal::{
    ignore, ignore_native, ignored, is_ignored, native_disposition, AltStack, Disposition,
    MaskHow, ShadowAction, ShadowSignalTable, Signal, SignalSet,
};

#[cfg(test)]
mod signal_tests {
    use super::*;

    #[test]
    fn test_signal_numbers_round_trip() {
        for signal in Signal::CRASH_SIGNALS {
            assert_eq!(Signal::from_number(signal.number()), Some(signal));
        }
        assert_eq!(Signal::from_number(libc::SIGINT), None);
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(Signal::Segv.to_string(), "SIGSEGV");
        assert_eq!(format!("{}", Signal::Pipe), "SIGPIPE");
    }

    #[test]
    fn test_signal_serde_names() {
        let json = serde_json::to_string(&Signal::Abrt).unwrap();
        assert_eq!(json, "\"SIGABRT\"");
        let back: Signal = serde_json::from_str("\"SIGFPE\"").unwrap();
        assert_eq!(back, Signal::Fpe);
    }
}

#[cfg(test)]
mod signal_set_tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = SignalSet::empty();
        assert!(set.is_empty());
        set.insert(libc::SIGPIPE);
        set.insert(libc::SIGBUS);
        assert!(set.contains(libc::SIGPIPE));
        assert_eq!(set.len(), 2);
        set.remove(libc::SIGPIPE);
        assert!(!set.contains(libc::SIGPIPE));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_out_of_range_numbers_are_ignored() {
        let mut set = SignalSet::empty();
        set.insert(0);
        set.insert(64);
        set.insert(-3);
        assert!(set.is_empty());
        assert!(!set.contains(0));
    }

    #[test]
    fn test_iter_is_ascending() {
        let set: SignalSet = [9, 2, 30].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 9, 30]);
    }

    #[test]
    fn test_union_and_difference() {
        let a: SignalSet = [1, 2].into_iter().collect();
        let b: SignalSet = [2, 3].into_iter().collect();
        assert_eq!(a.union(b).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(a.difference(b).iter().collect::<Vec<_>>(), vec![1]);
    }
}

#[cfg(test)]
mod runtime_level_tests {
    use super::*;

    #[test]
    fn test_ignore_is_idempotent() {
        ignore(&[Signal::Pipe]);
        let once = ignored();
        ignore(&[Signal::Pipe]);
        assert_eq!(ignored(), once);
        assert!(is_ignored(Signal::Pipe));
    }
}

#[cfg(test)]
mod native_level_tests {
    use super::*;

    #[test]
    fn test_ignore_native_sets_sig_ign() {
        ignore_native(Signal::Pipe).unwrap();
        assert_eq!(native_disposition(Signal::Pipe).unwrap(), Disposition::Ignore);
        // second application changes nothing
        ignore_native(Signal::Pipe).unwrap();
        assert_eq!(native_disposition(Signal::Pipe).unwrap(), Disposition::Ignore);
    }
}

#[cfg(test)]
mod shadow_table_tests {
    use super::*;

    #[test]
    fn test_sigaction_records_and_returns_previous() {
        let mut table = ShadowSignalTable::new();
        let handler = ShadowAction::new(Disposition::Handler(0x1000));

        let old = table.sigaction(libc::SIGUSR1, Some(handler)).unwrap();
        assert_eq!(old, ShadowAction::default());

        let old = table.sigaction(libc::SIGUSR1, None).unwrap();
        assert_eq!(old, handler);
    }

    #[test]
    fn test_sigaction_rejects_out_of_range() {
        let mut table = ShadowSignalTable::new();
        assert!(matches!(
            table.sigaction(0, None),
            Err(HardeningError::InvalidSignal(0))
        ));
        assert!(matches!(
            table.sigaction(32, None),
            Err(HardeningError::InvalidSignal(32))
        ));
    }

    #[test]
    fn test_sigaction_on_ignored_signal_ignores_natively() {
        // SIGFPE starts at SIG_DFL and nothing else here touches it
        assert_eq!(native_disposition(Signal::Fpe).unwrap(), Disposition::Default);
        ignore(&[Signal::Fpe]);
        assert_eq!(native_disposition(Signal::Fpe).unwrap(), Disposition::Default);

        let handler = ShadowAction::new(Disposition::Handler(0x2000));
        let mut table = ShadowSignalTable::new();
        table.sigaction(libc::SIGFPE, Some(handler)).unwrap();
        assert_eq!(native_disposition(Signal::Fpe).unwrap(), Disposition::Ignore);
        // the request itself is still recorded as made
        assert_eq!(table.sigaction(libc::SIGFPE, None).unwrap(), handler);
    }

    #[test]
    fn test_sigaction_on_other_signal_stays_virtual() {
        let mut table = ShadowSignalTable::new();
        table
            .sigaction(
                libc::SIGUSR2,
                Some(ShadowAction::new(Disposition::Handler(0x3000))),
            )
            .unwrap();
        // SAFETY: a null `act` only reads the current action.
        let native = unsafe {
            let mut old: libc::sigaction = std::mem::zeroed();
            assert_eq!(libc::sigaction(libc::SIGUSR2, std::ptr::null(), &mut old), 0);
            old.sa_sigaction
        };
        assert_eq!(native, libc::SIG_DFL);
    }

    #[test]
    fn test_sigprocmask_block_unblock_setmask() {
        let mut table = ShadowSignalTable::new();
        let a: SignalSet = [libc::SIGUSR1, libc::SIGUSR2].into_iter().collect();
        let b: SignalSet = [libc::SIGUSR2].into_iter().collect();

        assert!(table.sigprocmask(MaskHow::Block, Some(a)).is_empty());
        assert_eq!(table.sigprocmask(MaskHow::Unblock, Some(b)), a);
        assert_eq!(table.mask().iter().collect::<Vec<_>>(), vec![libc::SIGUSR1]);

        table.sigprocmask(MaskHow::SetMask, Some(b));
        assert_eq!(table.mask(), b);

        // query only
        assert_eq!(table.sigprocmask(MaskHow::Block, None), b);
        assert_eq!(table.mask(), b);
    }

    #[test]
    fn test_sigaltstack_keeps_previous() {
        let mut table = ShadowSignalTable::new();
        assert_eq!(table.sigaltstack(None), None);

        let stack = AltStack {
            base: 0x4000,
            size: 64 * 1024,
            flags: 0,
        };
        assert_eq!(table.sigaltstack(Some(stack)), None);
        assert_eq!(table.sigaltstack(None), Some(stack));
    }
}
