//! Sticky flags for asynchronous signal delivery.
//!
//! The handler only ever stores into single-word atomics; everything with
//! consequences happens when the event loop polls (and clears) the flags,
//! once per iteration.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static RECONFIGURE: AtomicBool = AtomicBool::new(false);
static BUMP: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(signo: libc::c_int) {
    match signo {
        libc::SIGINT | libc::SIGTERM => INTERRUPTED.store(true, Ordering::Relaxed),
        libc::SIGHUP => RECONFIGURE.store(true, Ordering::Relaxed),
        libc::SIGUSR1 => BUMP.store(true, Ordering::Relaxed),
        _ => {}
    }
}

pub fn install() -> io::Result<()> {
    for signo in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP, libc::SIGUSR1] {
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = on_signal as usize;
        action.sa_flags = 0;
        let failed = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signo, &action, std::ptr::null_mut()) != 0
        };
        if failed {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Got a SIGINT/SIGTERM: shut down cleanly.
pub fn take_interrupted() -> bool {
    INTERRUPTED.swap(false, Ordering::Relaxed)
}

/// Got a SIGHUP.
pub fn take_reconfigure() -> bool {
    RECONFIGURE.swap(false, Ordering::Relaxed)
}

/// Got a SIGUSR1: raise the HUD, or keep it up longer.
pub fn take_bump() -> bool {
    BUMP.swap(false, Ordering::Relaxed)
}
