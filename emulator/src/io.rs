pub mod console;
pub mod keyboard;
pub mod terminal;

use crate::EmulatorState;

// A device that intercepts reads and writes to the word addresses it is
// registered for.
pub trait MMIOHandler: Send {
    fn default_addrs(&self) -> &[u16] {
        &[]
    }

    fn read_word(&mut self, emu: &mut EmulatorState, addr: u16) -> u16;
    fn write_word(&mut self, emu: &mut EmulatorState, addr: u16, val: u16);
}
