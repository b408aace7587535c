use common::asm::{Cond, NUM_REGS, Reg};
use common::constants::{MEM_WORDS, PC_START};

use log::trace;

// This is separate so a mutable borrow can be passed to the MMIO handlers.
pub struct EmulatorState {
    num_ins: usize,
    mem: Vec<u16>,
    regs: [u16; NUM_REGS],
    pc: u16,
    cond: Cond,
}

impl EmulatorState {
    pub fn new() -> Self {
        EmulatorState {
            num_ins: 0usize,
            mem: vec![0; MEM_WORDS],
            regs: [0; NUM_REGS],
            pc: PC_START,
            cond: Cond::default(),
        }
    }

    pub fn inc_ins(&mut self) {
        self.num_ins += 1;
    }

    pub fn num_ins(&self) -> usize {
        self.num_ins
    }

    // Plain storage. Indexing is checked, so anything outside the address
    // space panics rather than touching other state.
    pub fn mem_read(&self, addr: u16) -> u16 {
        self.mem[usize::from(addr)]
    }

    pub fn mem_write(&mut self, addr: u16, val: u16) {
        trace!("Mem: writing {val:#06x} to {addr:#06x}");
        self.mem[usize::from(addr)] = val;
    }

    // Copies `words` in starting at `origin`. The caller has already clipped
    // them to the end of memory.
    pub fn mem_write_slice(&mut self, origin: u16, words: &[u16]) {
        let start = usize::from(origin);
        self.mem[start..start + words.len()].copy_from_slice(words);
    }

    pub fn reg_write(&mut self, reg: Reg, val: u16) {
        trace!("Reg: writing {val:#06x} to {reg}");
        self.regs[reg.index()] = val;
    }

    pub fn reg_read(&self, reg: Reg) -> u16 {
        self.regs[reg.index()]
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn cond(&self) -> Cond {
        self.cond
    }

    pub fn set_cond(&mut self, cond: Cond) {
        self.cond = cond;
    }

    // Recomputes the condition register from whatever `reg` now holds.
    pub fn update_flags(&mut self, reg: Reg) {
        self.cond = Cond::of(self.reg_read(reg));
    }

    // Writes a destination register and sets the condition codes from it.
    pub fn reg_define(&mut self, reg: Reg, val: u16) {
        self.reg_write(reg, val);
        self.update_flags(reg);
    }
}

impl Default for EmulatorState {
    fn default() -> Self {
        Self::new()
    }
}
