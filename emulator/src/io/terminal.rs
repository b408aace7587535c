use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::terminal;
use log::{debug, error};

// Owns the terminal's raw (unbuffered, unechoed) mode. Raw mode is entered by
// `enable()` and left when the guard drops, or earlier through any
// RestoreHandle, whichever comes first. It is only ever restored once.
#[derive(Debug, Default)]
pub struct RawTerminal {
    handle: RestoreHandle,
}

impl RawTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        self.handle.arm();
        debug!("Terminal: raw mode enabled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_armed()
    }

    // For paths that leave without unwinding, e.g. an interrupt that exits
    // the process.
    pub fn restore_handle(&self) -> RestoreHandle {
        self.handle.clone()
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(err) = self.handle.restore() {
            error!("Terminal: failed to restore: {err}");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreHandle {
    armed: Arc<AtomicBool>,
}

impl RestoreHandle {
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    // True for exactly one caller after the terminal was put in raw mode.
    fn claim(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }

    pub fn restore(&self) -> io::Result<()> {
        if self.claim() {
            terminal::disable_raw_mode()?;
            debug!("Terminal: raw mode disabled");
        }
        Ok(())
    }
}
