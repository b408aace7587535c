use crate::{assemble, load, run};
use common::asm::*;
use common::constants::PC_START;

#[test]
fn jsr_ret() {
    let (emu, _) = run(&[
        Ins::jsr(2),
        Ins::add(Reg::R1, Reg::R1, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
        // sub:
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(5)),
        Ins::ret(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 5);
    assert_eq!(emu.reg_read(Reg::R1), 1);
    assert_eq!(emu.pc(), PC_START + 3);
}

#[test]
fn jsr_backwards() {
    let (emu, _) = run(&[
        Ins::br(Cond::ALL, 2),
        // sub:
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(3)),
        Ins::ret(),
        Ins::jsr(-3),
        Ins::trap(TrapVector::Halt),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 3);
}

#[test]
fn jsr_sets_link() {
    let (mut emu, _) = load(&assemble(&[Ins::jsr(0x10)]));
    emu.run_ins().unwrap();
    assert_eq!(emu.reg_read(Reg::LINK), PC_START + 1);
    assert_eq!(emu.pc(), PC_START + 1 + 0x10);
}

#[test]
fn jsrr_ret() {
    let (emu, _) = run(&[
        Ins::pc_rel(Opcode::Lea, Reg::R2, 3),
        Ins::jsrr(Reg::R2),
        Ins::add(Reg::R1, Reg::R1, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
        // sub:
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(7)),
        Ins::ret(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 7);
    assert_eq!(emu.reg_read(Reg::R1), 1);
}

// The link is written first, so the jump goes to the word after the JSRR.
#[test]
fn jsrr_through_link() {
    let (emu, _) = run(&[
        Ins::pc_rel(Opcode::Lea, Reg::R7, 2),
        Ins::jsrr(Reg::R7),
        Ins::add(Reg::R1, Reg::R1, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 0);
    assert_eq!(emu.reg_read(Reg::R1), 1);
}

#[test]
fn jmp() {
    let (emu, _) = run(&[
        Ins::pc_rel(Opcode::Lea, Reg::R3, 2),
        Ins::jmp(Reg::R3),
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 0);
    assert_eq!(emu.pc(), PC_START + 4);
}

#[test]
fn nested_calls() {
    let (mut emu, _) = run(&[
        Ins::jsr(2),
        Ins::add(Reg::R1, Reg::R1, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
        // outer:
        Ins::pc_rel(Opcode::St, Reg::R7, 5),
        Ins::jsr(2),
        Ins::pc_rel(Opcode::Ld, Reg::R7, 3),
        Ins::ret(),
        // inner:
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(4)),
        Ins::ret(),
        // saved link, the word after the program
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 4);
    assert_eq!(emu.reg_read(Reg::R1), 1);
    assert_eq!(emu.mem_read(PC_START + 9), PC_START + 1);
}
