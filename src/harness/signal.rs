//! Asynchronous signal polling (spec.md §4.5, §5): the fuzzing front-end may
//! send the harness process a terminating signal (e.g. `SIGTERM` on a
//! front-end-imposed per-case timeout). The main loop polls for one pending
//! signal per iteration rather than reacting inside a signal handler, so a
//! crash artifact can still be written from ordinary, non-async-signal-safe
//! code before the process exits with `crash("signal_N")` / exit 126.

use std::sync::atomic::{AtomicI32, Ordering};

static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn record_signal(signum: libc::c_int) {
    PENDING_SIGNAL.store(signum, Ordering::SeqCst);
}

/// Installs handlers for the signals a front-end is expected to use to
/// terminate a hung or runaway harness invocation. Safe to call more than
/// once; later calls just re-install the same handler.
pub fn install_handlers() {
    for signum in [libc::SIGTERM, libc::SIGINT, libc::SIGHUP] {
        unsafe {
            libc::signal(signum, record_signal as libc::sighandler_t);
        }
    }
}

/// Returns the signal number the process received since the last call, if
/// any, clearing it so it's only reported once.
pub fn take_pending() -> Option<i32> {
    let signum = PENDING_SIGNAL.swap(0, Ordering::SeqCst);
    (signum != 0).then_some(signum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pending_signal_by_default() {
        assert_eq!(take_pending(), None);
    }

    #[test]
    fn recording_a_signal_surfaces_it_once() {
        record_signal(15);
        assert_eq!(take_pending(), Some(15));
        assert_eq!(take_pending(), None);
    }
}
