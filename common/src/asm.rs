use crate::misc::{field_mask, sign_extend};

use std::fmt;

use delegate::delegate;
use derive_more::IsVariant;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Br = 0,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    Rti, // Unused
    Not,
    Ldi,
    Sti,
    Jmp,
    Res, // Reserved
    Lea,
    Trap,
}

impl Opcode {
    pub const NUM_BITS: u32 = 4;
    pub const SHIFT: u32 = u16::BITS - Self::NUM_BITS;

    pub fn of(input: u16) -> Opcode {
        // Every 4 bit value names a variant.
        Self::ALL[(input >> Self::SHIFT) as usize]
    }

    pub fn encode(self) -> u16 {
        (self as u16) << Self::SHIFT
    }

    const ALL: [Opcode; 16] = [
        Opcode::Br,
        Opcode::Add,
        Opcode::Ld,
        Opcode::St,
        Opcode::Jsr,
        Opcode::And,
        Opcode::Ldr,
        Opcode::Str,
        Opcode::Rti,
        Opcode::Not,
        Opcode::Ldi,
        Opcode::Sti,
        Opcode::Jmp,
        Opcode::Res,
        Opcode::Lea,
        Opcode::Trap,
    ];
}


////////////////////////////////////////////////////////////////////////////////


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

pub const NUM_REGS: usize = 8;

impl Reg {
    pub const NUM_BITS: u32 = 3;
    pub const MASK: u16 = (1u16 << Self::NUM_BITS) - 1;

    // JSR, JSRR and TRAP leave the return address here.
    pub const LINK: Reg = Reg::R7;

    const ALL: [Reg; NUM_REGS] = [
        Reg::R0,
        Reg::R1,
        Reg::R2,
        Reg::R3,
        Reg::R4,
        Reg::R5,
        Reg::R6,
        Reg::R7,
    ];

    // The 3 bit register field whose lowest bit is `shift`.
    pub fn from_field(input: u16, shift: u32) -> Reg {
        Self::ALL[((input >> shift) & Self::MASK) as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn encode(self) -> u16 {
        self as u16
    }
}


////////////////////////////////////////////////////////////////////////////////


#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum TrapVector {
    GetC = 0x20,
    Out = 0x21,
    PutS = 0x22,
    In = 0x23,
    PutSp = 0x24,
    Halt = 0x25,
}

impl TrapVector {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<TrapVector> {
        Self::from_u8(code)
    }
}

impl fmt::Display for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}


////////////////////////////////////////////////////////////////////////////////


// The condition register. Holding an enum rather than raw bits means exactly
// one of N, Z and P is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IsVariant)]
pub enum Cond {
    Positive,
    #[default]
    Zero,
    Negative,
}

impl Cond {
    pub const P: u16 = 0x1 << 0;
    pub const Z: u16 = 0x1 << 1;
    pub const N: u16 = 0x1 << 2;
    pub const ALL: u16 = Self::N | Self::Z | Self::P;

    pub fn of(val: u16) -> Cond {
        if val == 0 {
            Cond::Zero
        } else if val >> (u16::BITS - 1) != 0 {
            Cond::Negative
        } else {
            Cond::Positive
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            Cond::Positive => Self::P,
            Cond::Zero => Self::Z,
            Cond::Negative => Self::N,
        }
    }
}


////////////////////////////////////////////////////////////////////////////////


const DR_SHIFT: u32 = 9;
const SR1_SHIFT: u32 = 6;
const IMM_FLAG: u16 = 0x1 << 5;
const IMM5_BITS: u32 = 5;
const OFFSET6_BITS: u32 = 6;
const PC_OFFSET9_BITS: u32 = 9;
const PC_OFFSET11_BITS: u32 = 11;
const JSR_FLAG: u16 = 0x1 << 11;
const TRAP_VECTOR_MASK: u16 = 0xff;

// Writes an offset relative to the incremented PC, followed by the address it
// resolves to when the instruction's own address is known.
fn fmt_offset(f: &mut fmt::Formatter, offset: u16, pc: Option<u16>) -> fmt::Result {
    write!(f, "#{}", offset as i16)?;
    if let Some(pc) = pc {
        write!(f, " ; {:#06x}", pc.wrapping_add(1).wrapping_add(offset))?;
    }
    Ok(())
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Src2 {
    Reg(Reg),
    Imm(u16), // Already sign-extended
}

impl Src2 {
    fn decode(input: u16) -> Src2 {
        if input & IMM_FLAG != 0 {
            Src2::Imm(sign_extend(input, IMM5_BITS))
        } else {
            Src2::Reg(Reg::from_field(input, 0))
        }
    }

    fn encode(&self) -> u16 {
        match self {
            Src2::Reg(r) => r.encode(),
            Src2::Imm(val) => IMM_FLAG | (val & field_mask(IMM5_BITS)),
        }
    }
}

impl fmt::Display for Src2 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Src2::Reg(r) => write!(f, "{r}"),
            Src2::Imm(val) => write!(f, "#{}", *val as i16),
        }
    }
}


// ADD and AND
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperateIns {
    pub op: Opcode,
    pub dr: Reg,
    pub sr1: Reg,
    pub src2: Src2,
}

impl OperateIns {
    pub(crate) fn decode(input: u16) -> Option<Ins> {
        let op = Opcode::of(input);
        if !matches!(op, Opcode::Add | Opcode::And) {
            return None;
        }
        Some(Ins::Operate(OperateIns {
            op,
            dr: Reg::from_field(input, DR_SHIFT),
            sr1: Reg::from_field(input, SR1_SHIFT),
            src2: Src2::decode(input),
        }))
    }

    pub fn encode(&self) -> u16 {
        self.op.encode()
            | (self.dr.encode() << DR_SHIFT)
            | (self.sr1.encode() << SR1_SHIFT)
            | self.src2.encode()
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for OperateIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = format!("{:?}", self.op).to_lowercase();
        write!(f, "{name} {}, {}, {}", self.dr, self.sr1, self.src2)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotIns {
    pub dr: Reg,
    pub sr: Reg,
}

impl NotIns {
    // The low 6 bits are always set in a well-formed NOT.
    const LOWER_ONES: u16 = 0x3f;

    pub(crate) fn decode(input: u16) -> Option<Ins> {
        if Opcode::of(input) != Opcode::Not {
            return None;
        }
        Some(Ins::Not(NotIns {
            dr: Reg::from_field(input, DR_SHIFT),
            sr: Reg::from_field(input, SR1_SHIFT),
        }))
    }

    pub fn encode(&self) -> u16 {
        Opcode::Not.encode()
            | (self.dr.encode() << DR_SHIFT)
            | (self.sr.encode() << SR1_SHIFT)
            | Self::LOWER_ONES
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for NotIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "not {}, {}", self.dr, self.sr)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchIns {
    pub mask: u16, // Cond::N | Cond::Z | Cond::P
    pub offset: u16,
}

impl BranchIns {
    pub(crate) fn decode(input: u16) -> Option<Ins> {
        if Opcode::of(input) != Opcode::Br {
            return None;
        }
        Some(Ins::Branch(BranchIns {
            mask: (input >> DR_SHIFT) & Cond::ALL,
            offset: sign_extend(input, PC_OFFSET9_BITS),
        }))
    }

    pub fn encode(&self) -> u16 {
        Opcode::Br.encode()
            | ((self.mask & Cond::ALL) << DR_SHIFT)
            | (self.offset & field_mask(PC_OFFSET9_BITS))
    }

    pub fn taken(&self, cond: Cond) -> bool {
        self.mask & cond.bits() != 0
    }

    fn fmt_impl(&self, f: &mut fmt::Formatter, pc: Option<u16>) -> fmt::Result {
        write!(f, "br")?;
        for (bit, ch) in [(Cond::N, 'n'), (Cond::Z, 'z'), (Cond::P, 'p')] {
            if self.mask & bit != 0 {
                write!(f, "{ch}")?;
            }
        }
        write!(f, " ")?;
        fmt_offset(f, self.offset, pc)
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result {
        self.fmt_impl(f, Some(pc))
    }
}

impl fmt::Display for BranchIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_impl(f, None)
    }
}


// JMP, and RET when base is the link register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JmpIns {
    pub base: Reg,
}

impl JmpIns {
    pub(crate) fn decode(input: u16) -> Option<Ins> {
        if Opcode::of(input) != Opcode::Jmp {
            return None;
        }
        Some(Ins::Jmp(JmpIns { base: Reg::from_field(input, SR1_SHIFT) }))
    }

    pub fn encode(&self) -> u16 {
        Opcode::Jmp.encode() | (self.base.encode() << SR1_SHIFT)
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for JmpIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.base == Reg::LINK {
            write!(f, "ret")
        } else {
            write!(f, "jmp {}", self.base)
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsrTarget {
    Offset(u16), // JSR
    Reg(Reg),    // JSRR
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsrIns {
    pub target: JsrTarget,
}

impl JsrIns {
    pub(crate) fn decode(input: u16) -> Option<Ins> {
        if Opcode::of(input) != Opcode::Jsr {
            return None;
        }
        let target = if input & JSR_FLAG != 0 {
            JsrTarget::Offset(sign_extend(input, PC_OFFSET11_BITS))
        } else {
            JsrTarget::Reg(Reg::from_field(input, SR1_SHIFT))
        };
        Some(Ins::Jsr(JsrIns { target }))
    }

    pub fn encode(&self) -> u16 {
        let lower = match self.target {
            JsrTarget::Offset(offset) => JSR_FLAG | (offset & field_mask(PC_OFFSET11_BITS)),
            JsrTarget::Reg(base) => base.encode() << SR1_SHIFT,
        };
        Opcode::Jsr.encode() | lower
    }

    fn fmt_impl(&self, f: &mut fmt::Formatter, pc: Option<u16>) -> fmt::Result {
        match self.target {
            JsrTarget::Offset(offset) => {
                write!(f, "jsr ")?;
                fmt_offset(f, offset, pc)
            }
            JsrTarget::Reg(base) => write!(f, "jsrr {base}"),
        }
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result {
        self.fmt_impl(f, Some(pc))
    }
}

impl fmt::Display for JsrIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_impl(f, None)
    }
}


// LD, LDI, LEA, ST and STI: a register and a 9 bit PC-relative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcRelIns {
    pub op: Opcode,
    pub reg: Reg,
    pub offset: u16,
}

impl PcRelIns {
    pub(crate) fn decode(input: u16) -> Option<Ins> {
        let op = Opcode::of(input);
        if !matches!(op, Opcode::Ld | Opcode::Ldi | Opcode::Lea | Opcode::St | Opcode::Sti) {
            return None;
        }
        Some(Ins::PcRel(PcRelIns {
            op,
            reg: Reg::from_field(input, DR_SHIFT),
            offset: sign_extend(input, PC_OFFSET9_BITS),
        }))
    }

    pub fn encode(&self) -> u16 {
        self.op.encode()
            | (self.reg.encode() << DR_SHIFT)
            | (self.offset & field_mask(PC_OFFSET9_BITS))
    }

    fn fmt_impl(&self, f: &mut fmt::Formatter, pc: Option<u16>) -> fmt::Result {
        let name = format!("{:?}", self.op).to_lowercase();
        write!(f, "{name} {}, ", self.reg)?;
        fmt_offset(f, self.offset, pc)
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result {
        self.fmt_impl(f, Some(pc))
    }
}

impl fmt::Display for PcRelIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_impl(f, None)
    }
}


// LDR and STR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseOffsetIns {
    pub op: Opcode,
    pub reg: Reg,
    pub base: Reg,
    pub offset: u16,
}

impl BaseOffsetIns {
    pub(crate) fn decode(input: u16) -> Option<Ins> {
        let op = Opcode::of(input);
        if !matches!(op, Opcode::Ldr | Opcode::Str) {
            return None;
        }
        Some(Ins::BaseOffset(BaseOffsetIns {
            op,
            reg: Reg::from_field(input, DR_SHIFT),
            base: Reg::from_field(input, SR1_SHIFT),
            offset: sign_extend(input, OFFSET6_BITS),
        }))
    }

    pub fn encode(&self) -> u16 {
        self.op.encode()
            | (self.reg.encode() << DR_SHIFT)
            | (self.base.encode() << SR1_SHIFT)
            | (self.offset & field_mask(OFFSET6_BITS))
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for BaseOffsetIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = format!("{:?}", self.op).to_lowercase();
        write!(f, "{name} {}, {}, #{}", self.reg, self.base, self.offset as i16)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapIns {
    pub vector: u8,
}

impl TrapIns {
    pub fn new(vector: TrapVector) -> TrapIns {
        TrapIns { vector: vector.code() }
    }

    pub(crate) fn decode(input: u16) -> Option<Ins> {
        if Opcode::of(input) != Opcode::Trap {
            return None;
        }
        Some(Ins::Trap(TrapIns { vector: (input & TRAP_VECTOR_MASK) as u8 }))
    }

    pub fn encode(&self) -> u16 {
        Opcode::Trap.encode() | self.vector as u16
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TrapIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match TrapVector::from_code(self.vector) {
            Some(trap) => write!(f, "{trap}"),
            None => write!(f, "trap {:#04x}", self.vector),
        }
    }
}


////////////////////////////////////////////////////////////////////////////////


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ins {
    Operate(OperateIns),
    Not(NotIns),
    Branch(BranchIns),
    Jmp(JmpIns),
    Jsr(JsrIns),
    PcRel(PcRelIns),
    BaseOffset(BaseOffsetIns),
    Trap(TrapIns),
}

impl Ins {
    delegate! {
        to match self {
            Ins::Operate(x) => x,
            Ins::Not(x) => x,
            Ins::Branch(x) => x,
            Ins::Jmp(x) => x,
            Ins::Jsr(x) => x,
            Ins::PcRel(x) => x,
            Ins::BaseOffset(x) => x,
            Ins::Trap(x) => x,
        } {
            pub fn encode(&self) -> u16;
            pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result;
        }
    }

    pub fn display_with_pc(&self, pc: u16) -> InsWithPc<'_> {
        InsWithPc(self, pc)
    }

    // Convenience constructors, mostly for building programs by hand.

    pub fn add(dr: Reg, sr1: Reg, src2: Src2) -> Ins {
        Ins::Operate(OperateIns { op: Opcode::Add, dr, sr1, src2 })
    }

    pub fn and(dr: Reg, sr1: Reg, src2: Src2) -> Ins {
        Ins::Operate(OperateIns { op: Opcode::And, dr, sr1, src2 })
    }

    pub fn not(dr: Reg, sr: Reg) -> Ins {
        Ins::Not(NotIns { dr, sr })
    }

    pub fn br(mask: u16, offset: i16) -> Ins {
        Ins::Branch(BranchIns { mask, offset: offset as u16 })
    }

    pub fn jmp(base: Reg) -> Ins {
        Ins::Jmp(JmpIns { base })
    }

    pub fn ret() -> Ins {
        Self::jmp(Reg::LINK)
    }

    pub fn jsr(offset: i16) -> Ins {
        Ins::Jsr(JsrIns { target: JsrTarget::Offset(offset as u16) })
    }

    pub fn jsrr(base: Reg) -> Ins {
        Ins::Jsr(JsrIns { target: JsrTarget::Reg(base) })
    }

    pub fn pc_rel(op: Opcode, reg: Reg, offset: i16) -> Ins {
        Ins::PcRel(PcRelIns { op, reg, offset: offset as u16 })
    }

    pub fn base_offset(op: Opcode, reg: Reg, base: Reg, offset: i16) -> Ins {
        Ins::BaseOffset(BaseOffsetIns { op, reg, base, offset: offset as u16 })
    }

    pub fn trap(vector: TrapVector) -> Ins {
        Ins::Trap(TrapIns::new(vector))
    }
}

impl fmt::Display for Ins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ins::Operate(ins) => write!(f, "{ins}"),
            Ins::Not(ins) => write!(f, "{ins}"),
            Ins::Branch(ins) => write!(f, "{ins}"),
            Ins::Jmp(ins) => write!(f, "{ins}"),
            Ins::Jsr(ins) => write!(f, "{ins}"),
            Ins::PcRel(ins) => write!(f, "{ins}"),
            Ins::BaseOffset(ins) => write!(f, "{ins}"),
            Ins::Trap(ins) => write!(f, "{ins}"),
        }
    }
}

// Just for formatting, like Path::Display()
pub struct InsWithPc<'a>(&'a Ins, u16);

impl fmt::Display for InsWithPc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt_with_pc(f, self.1)
    }
}

