//! Ctrl+C handling and interruptible waits.
//!
//! The console handler only flips a flag. Every wait in the pipeline goes
//! through a `Pacer`, which sleeps in short slices and bails out with
//! `PipelineError::Interrupted` once the flag is set.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::PipelineError;

/// Set by the console interrupt handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Granularity of interruptible sleeps.
const SLICE: Duration = Duration::from_millis(50);

#[cfg(windows)]
pub fn install_handler() -> Result<()> {
    use windows::Win32::Foundation::{BOOL, FALSE, TRUE};
    use windows::Win32::System::Console::{
        SetConsoleCtrlHandler, CTRL_BREAK_EVENT, CTRL_C_EVENT,
    };

    unsafe extern "system" fn on_console_ctrl(ctrl_type: u32) -> BOOL {
        if ctrl_type == CTRL_C_EVENT || ctrl_type == CTRL_BREAK_EVENT {
            INTERRUPTED.store(true, Ordering::SeqCst);
            TRUE
        } else {
            FALSE
        }
    }

    unsafe { SetConsoleCtrlHandler(Some(on_console_ctrl), TRUE)? };
    Ok(())
}

#[cfg(unix)]
pub fn install_handler() -> Result<()> {
    extern "C" fn on_sigint(_signal: libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(not(any(windows, unix)))]
pub fn install_handler() -> Result<()> {
    Ok(())
}

/// Performs the pipeline's fixed waits, watching a stop flag.
#[derive(Clone, Copy)]
pub struct Pacer<'a> {
    stop: &'a AtomicBool,
}

impl Pacer<'static> {
    /// Pacer bound to the process-wide Ctrl+C flag.
    pub fn global() -> Self {
        Self { stop: &INTERRUPTED }
    }
}

impl<'a> Pacer<'a> {
    pub fn new(stop: &'a AtomicBool) -> Self {
        Self { stop }
    }

    /// Fails with `Interrupted` if a stop was requested.
    pub fn check(&self) -> Result<()> {
        if self.stop.load(Ordering::SeqCst) {
            return Err(PipelineError::Interrupted.into());
        }
        Ok(())
    }

    /// Sleeps for `duration`, waking early if a stop is requested.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }

    /// Prints `secs, secs-1, ..., 1`, one per second.
    pub fn countdown(&self, secs: u64) -> Result<()> {
        for remaining in (1..=secs).rev() {
            println!("{}", remaining);
            self.sleep(Duration::from_secs(1))?;
        }
        self.check()
    }
}
