use std::sync::Arc;

use common::constants::{KBDR, KBSR, KBSR_READY};
use log::{debug, error, trace};

use crate::EmulatorState;
use crate::io::MMIOHandler;
use crate::io::console::Console;

// Keyboard status/data register pair. Only KBSR is intercepted: reading it
// polls the console and, when a key is waiting, latches it into KBDR, which is
// otherwise ordinary memory.
pub struct Keyboard {
    device: Arc<dyn Console>,
    // Programs spin on KBSR, so a failing console is only reported once.
    poll_failed: bool,
}

impl Keyboard {
    pub fn new(device: Arc<dyn Console>) -> Self {
        Keyboard { device, poll_failed: false }
    }

    fn kbsr_read(&mut self, state: &mut EmulatorState) -> u16 {
        match self.device.poll_input() {
            Ok(Some(ch)) => {
                trace!("Keyboard: latched {ch:#04x}");
                state.mem_write(KBSR, KBSR_READY);
                state.mem_write(KBDR, u16::from(ch));
            }
            Ok(None) => state.mem_write(KBSR, 0),
            Err(err) => {
                if self.poll_failed {
                    debug!("Keyboard: polling the console failed: {err}");
                } else {
                    error!("Keyboard: polling the console failed: {err}; treating it as no input");
                    self.poll_failed = true;
                }
                state.mem_write(KBSR, 0);
            }
        }
        state.mem_read(KBSR)
    }
}

impl MMIOHandler for Keyboard {
    fn read_word(&mut self, state: &mut EmulatorState, addr: u16) -> u16 {
        match addr {
            KBSR => self.kbsr_read(state),
            _ => panic!("Keyboard doesn't handle address {addr:#06x}"),
        }
    }

    fn write_word(&mut self, state: &mut EmulatorState, addr: u16, val: u16) {
        match addr {
            KBSR => state.mem_write(addr, val),
            _ => panic!("Keyboard doesn't handle address {addr:#06x}"),
        }
    }

    fn default_addrs(&self) -> &[u16] {
        &[KBSR]
    }
}
