use common::asm::{Reg, TrapIns, TrapVector};
use crate::emulator::{Emulator, ExecError, ExecRet};

use log::{info, warn};

impl Emulator {
    pub const IN_PROMPT: &'static str = "Enter a character: ";
    pub const HALT_MESSAGE: &'static str = "\nHALT\n";

    // The return address goes in R7 as for JSR, but nothing uses it; after
    // the service routine execution simply carries on at the next word.
    pub(crate) fn exec_trap_ins(&mut self, ins: &TrapIns) -> Result<ExecRet, ExecError> {
        let pc = self.pc();
        self.reg_write(Reg::LINK, pc);

        let Some(trap) = TrapVector::from_code(ins.vector) else {
            warn!("Unknown trap vector {:#04x} at {:#06x}", ins.vector, pc.wrapping_sub(1));
            return Ok(ExecRet::Ok);
        };

        match trap {
            TrapVector::GetC => self.trap_getc()?,
            TrapVector::Out => self.trap_out()?,
            TrapVector::PutS => self.trap_puts()?,
            TrapVector::In => self.trap_in()?,
            TrapVector::PutSp => self.trap_putsp()?,
            TrapVector::Halt => {
                self.trap_halt()?;
                return Ok(ExecRet::Halt);
            }
        }
        Ok(ExecRet::Ok)
    }

    fn trap_getc(&mut self) -> Result<(), ExecError> {
        let ch = self.console.read_input()?;
        self.get_state_mut().reg_define(Reg::R0, u16::from(ch));
        Ok(())
    }

    fn trap_out(&mut self) -> Result<(), ExecError> {
        let ch = self.reg_read(Reg::R0) as u8;
        self.console.write_output(&[ch])?;
        self.console.flush()?;
        Ok(())
    }

    // One character per word, up to a zero word. Reads memory directly, so
    // device registers in the string aren't triggered.
    fn trap_puts(&mut self) -> Result<(), ExecError> {
        let state = self.get_state();
        let mut addr = self.reg_read(Reg::R0);
        let mut out = vec![];
        loop {
            let word = state.mem_read(addr);
            if word == 0 {
                break;
            }
            out.push(word as u8);
            addr = addr.wrapping_add(1);
        }
        self.console.write_output(&out)?;
        self.console.flush()?;
        Ok(())
    }

    fn trap_in(&mut self) -> Result<(), ExecError> {
        self.console.write_output(Self::IN_PROMPT.as_bytes())?;
        self.console.flush()?;
        let ch = self.console.read_input()?;
        self.console.write_output(&[ch])?;
        self.console.flush()?;
        self.get_state_mut().reg_define(Reg::R0, u16::from(ch));
        Ok(())
    }

    // Two characters per word, low byte first. A zero high byte ends the
    // string as well as a zero word.
    fn trap_putsp(&mut self) -> Result<(), ExecError> {
        let state = self.get_state();
        let mut addr = self.reg_read(Reg::R0);
        let mut out = vec![];
        loop {
            let [low, high] = state.mem_read(addr).to_le_bytes();
            if low == 0 && high == 0 {
                break;
            }
            out.push(low);
            if high == 0 {
                break;
            }
            out.push(high);
            addr = addr.wrapping_add(1);
        }
        self.console.write_output(&out)?;
        self.console.flush()?;
        Ok(())
    }

    fn trap_halt(&mut self) -> Result<(), ExecError> {
        self.console.write_output(Self::HALT_MESSAGE.as_bytes())?;
        self.console.flush()?;
        self.running = false;
        info!("HALT at {:#06x}", self.pc().wrapping_sub(1));
        Ok(())
    }
}
