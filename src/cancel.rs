//! Cooperative cancellation for a single run.
//!
//! Long operations call [`CancelToken::check`] before each remote call and
//! before each statistics computation. A token created with
//! [`CancelToken::with_interrupts`] also observes SIGINT once
//! [`install_interrupt_handler`] has run.

use crate::error::{Result, StatsError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    watch_interrupts: bool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interrupts() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            watch_interrupts: true,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || (self.watch_interrupts && INTERRUPTED.load(Ordering::SeqCst))
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StatsError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(unix)]
extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT into the process-wide interrupt flag.
///
/// Replaces the process-wide SIGINT disposition; call once during startup.
#[cfg(unix)]
#[allow(unsafe_code)]
pub fn install_interrupt_handler() -> std::io::Result<()> {
    use std::ptr;
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe. The sigaction struct is zero-initialised and its
    // mask cleared with sigemptyset before use. Installing it only swaps the
    // SIGINT disposition, so calling this again is harmless.
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        if libc::sigaction(libc::SIGINT, &sa, ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install_interrupt_handler() -> std::io::Result<()> {
    Ok(())
}
