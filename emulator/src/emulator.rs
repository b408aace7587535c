use common::asm::*;
use common::decoder::decode;
use common::constants::PC_START;
use crate::EmulatorState;
use crate::MMIOHandler;
use crate::io::console::Console;
use crate::io::keyboard::Keyboard;

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use delegate::delegate;
use log::{debug, info};
use thiserror::Error;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecRet {
    Ok,
    Halt,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Invalid opcode {opcode:#x} at {pc:#06x}")]
    InvalidOpcode { opcode: u16, pc: u16 },

    #[error("Console I/O failed: {0}")]
    Console(#[from] io::Error),
}


pub struct Emulator {
    state: EmulatorState,
    mmio_handlers: HashMap<u16, Arc<Mutex<dyn MMIOHandler>>>,
    pub(crate) console: Arc<dyn Console>,
    pub(crate) running: bool,
}

impl Emulator {
    pub fn new(console: Arc<dyn Console>) -> Emulator {
        let mut emu = Emulator {
            state: EmulatorState::new(),
            mmio_handlers: HashMap::new(),
            console: console.clone(),
            running: true,
        };
        emu.set_mmio_handler(Keyboard::new(console));
        emu
    }

    delegate! {
        to self.state {
            pub fn reg_read(&self, reg: Reg) -> u16;
            pub fn reg_write(&mut self, reg: Reg, val: u16);
            pub fn pc(&self) -> u16;
            pub fn set_pc(&mut self, pc: u16);
            pub fn cond(&self) -> Cond;
            pub fn set_cond(&mut self, cond: Cond);
            pub fn num_ins(&self) -> usize;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // Back to the power-on register state: flags zero, PC at `pc`.
    pub fn reset(&mut self, pc: u16) {
        self.state.set_cond(Cond::Zero);
        self.state.set_pc(pc);
        self.running = true;
    }

    // Run until a halt or a fatal error.
    pub fn run(&mut self) -> Result<(), ExecError> {
        while self.running {
            self.run_ins()?;
        }
        info!("Halted after {} instructions", self.state.num_ins());
        Ok(())
    }

    pub fn run_at(&mut self, pc: u16) -> Result<(), ExecError> {
        self.reset(pc);
        self.run()
    }

    pub fn run_from_start(&mut self) -> Result<(), ExecError> {
        self.run_at(PC_START)
    }

    // Fetch, decode and execute a single instruction.
    pub fn run_ins(&mut self) -> Result<ExecRet, ExecError> {
        let pc = self.state.pc();
        let raw = self.mem_read(pc);
        self.state.set_pc(pc.wrapping_add(1));
        self.state.inc_ins();

        let Some(ins) = decode(raw) else {
            self.running = false;
            let opcode = raw >> Opcode::SHIFT;
            debug!("Invalid opcode {opcode:#x} (instruction {raw:#06x}) at {pc:#06x}");
            return Err(ExecError::InvalidOpcode { opcode, pc });
        };
        debug!("PC: {pc:#06x}: {}", ins.display_with_pc(pc));

        self.exec(&ins)
    }

    pub fn set_mmio_handler_for<M, I>(&mut self, handler: M, addrs: I)
    where
        M: MMIOHandler + 'static,
        I: IntoIterator<Item = u16> {

        let handler = Arc::new(Mutex::new(handler));
        for addr in addrs.into_iter() {
            self.register_handler(handler.clone(), addr);
        }
    }

    pub fn set_mmio_handler(&mut self, handler: impl MMIOHandler + 'static) {
        let addrs = handler.default_addrs().to_vec();
        self.set_mmio_handler_for(handler, addrs);
    }

    // Replaces whatever was handling `addr` before.
    fn register_handler(&mut self, handler: Arc<Mutex<dyn MMIOHandler>>, addr: u16) {
        if self.mmio_handlers.insert(addr, handler).is_some() {
            debug!("Replaced MMIOHandler for {addr:#06x}");
        }
    }


    ///////////////////////////////////////////////////////////////////////////


    pub fn mem_read(&mut self, addr: u16) -> u16 {
        if let Some(handler) = self.mmio_handlers.get(&addr) {
            let mut handler = handler.lock().unwrap_or_else(PoisonError::into_inner);
            return handler.read_word(&mut self.state, addr);
        }
        self.state.mem_read(addr)
    }

    pub fn mem_write(&mut self, addr: u16, val: u16) {
        if let Some(handler) = self.mmio_handlers.get(&addr) {
            let mut handler = handler.lock().unwrap_or_else(PoisonError::into_inner);
            handler.write_word(&mut self.state, addr, val);
            return;
        }
        self.state.mem_write(addr, val)
    }

    pub fn get_state(&self) -> &EmulatorState {
        &self.state
    }

    pub fn get_state_mut(&mut self) -> &mut EmulatorState {
        &mut self.state
    }

    ///////////////////////////////////////////////////////////////////////////
    // Execute
    ///////////////////////////////////////////////////////////////////////////

    fn read_src2(&self, src2: Src2) -> u16 {
        match src2 {
            Src2::Reg(r) => self.state.reg_read(r),
            Src2::Imm(val) => val,
        }
    }

    // PC-relative operands are relative to the already incremented PC.
    fn pc_offset(&self, offset: u16) -> u16 {
        self.state.pc().wrapping_add(offset)
    }

    fn exec_operate_ins(&mut self, ins: &OperateIns) {
        let lhs = self.state.reg_read(ins.sr1);
        let rhs = self.read_src2(ins.src2);
        let val = match ins.op {
            Opcode::Add => lhs.wrapping_add(rhs),
            Opcode::And => lhs & rhs,
            op => unreachable!("{op:?} is not an operate instruction"),
        };
        self.state.reg_define(ins.dr, val);
    }

    fn exec_not_ins(&mut self, ins: &NotIns) {
        let val = !self.state.reg_read(ins.sr);
        self.state.reg_define(ins.dr, val);
    }

    fn exec_branch_ins(&mut self, ins: &BranchIns) {
        if ins.taken(self.state.cond()) {
            self.state.set_pc(self.pc_offset(ins.offset));
        }
    }

    fn exec_jmp_ins(&mut self, ins: &JmpIns) {
        let target = self.state.reg_read(ins.base);
        self.state.set_pc(target);
    }

    fn exec_jsr_ins(&mut self, ins: &JsrIns) {
        // The link is written before the base is read, so JSRR R7 lands on
        // the word after itself.
        self.state.reg_write(Reg::LINK, self.state.pc());
        let target = match ins.target {
            JsrTarget::Offset(offset) => self.pc_offset(offset),
            JsrTarget::Reg(base) => self.state.reg_read(base),
        };
        self.state.set_pc(target);
    }

    fn exec_pc_rel_ins(&mut self, ins: &PcRelIns) {
        let addr = self.pc_offset(ins.offset);
        match ins.op {
            Opcode::Ld => {
                let val = self.mem_read(addr);
                self.state.reg_define(ins.reg, val);
            }
            Opcode::Ldi => {
                let ptr = self.mem_read(addr);
                let val = self.mem_read(ptr);
                self.state.reg_define(ins.reg, val);
            }
            Opcode::Lea => self.state.reg_define(ins.reg, addr),
            Opcode::St => self.mem_write(addr, self.state.reg_read(ins.reg)),
            Opcode::Sti => {
                let ptr = self.mem_read(addr);
                self.mem_write(ptr, self.state.reg_read(ins.reg));
            }
            op => unreachable!("{op:?} is not PC-relative"),
        }
    }

    fn exec_base_offset_ins(&mut self, ins: &BaseOffsetIns) {
        let addr = self.state.reg_read(ins.base).wrapping_add(ins.offset);
        match ins.op {
            Opcode::Ldr => {
                let val = self.mem_read(addr);
                self.state.reg_define(ins.reg, val);
            }
            Opcode::Str => self.mem_write(addr, self.state.reg_read(ins.reg)),
            op => unreachable!("{op:?} is not base+offset"),
        }
    }

    fn exec(&mut self, ins: &Ins) -> Result<ExecRet, ExecError> {
        match ins {
            Ins::Operate(ins) => self.exec_operate_ins(ins),
            Ins::Not(ins) => self.exec_not_ins(ins),
            Ins::Branch(ins) => self.exec_branch_ins(ins),
            Ins::Jmp(ins) => self.exec_jmp_ins(ins),
            Ins::Jsr(ins) => self.exec_jsr_ins(ins),
            Ins::PcRel(ins) => self.exec_pc_rel_ins(ins),
            Ins::BaseOffset(ins) => self.exec_base_offset_ins(ins),
            Ins::Trap(ins) => return self.exec_trap_ins(ins),
        }
        Ok(ExecRet::Ok)
    }
}
