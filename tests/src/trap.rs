use crate::{assemble, load, output, run};
use common::asm::*;
use common::constants::PC_START;
use emu_lib::{Emulator, ExecError, ExecRet};

// Each character of `s` in its own word, then a zero word.
fn string(s: &str) -> Vec<u16> {
    s.bytes().map(u16::from).chain(std::iter::once(0)).collect()
}

#[test]
fn halt_only() {
    let (mut emu, console) = load(&assemble(&[Ins::trap(TrapVector::Halt)]));
    assert_eq!(emu.run_ins().unwrap(), ExecRet::Halt);
    assert!(!emu.is_running());
    assert_eq!(emu.num_ins(), 1);
    assert_eq!(console.take_output_string(), Emulator::HALT_MESSAGE);
}

#[test]
fn run_from_start() {
    let (mut emu, console) = load(&assemble(&[
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
    ]));
    emu.set_pc(0x4000);
    emu.run_from_start().unwrap();
    assert_eq!(emu.reg_read(Reg::R0), 1);
    assert_eq!(emu.num_ins(), 2);
    assert_eq!(output(&console), "");
}

#[test]
fn out() {
    let (mut emu, console) = load(&assemble(&[Ins::trap(TrapVector::Out), Ins::trap(TrapVector::Halt)]));
    // Only the low byte is written.
    emu.reg_write(Reg::R0, 0x0100 | u16::from(b'A'));
    emu.run().unwrap();
    assert_eq!(output(&console), "A");
}

#[test]
fn puts_stops_at_zero() {
    let mut words = assemble(&[
        Ins::pc_rel(Opcode::Lea, Reg::R0, 2),
        Ins::trap(TrapVector::PutS),
        Ins::trap(TrapVector::Halt),
    ]);
    words.extend([u16::from(b'A'), u16::from(b'B'), 0, u16::from(b'C')]);
    let (mut emu, console) = load(&words);
    emu.run().unwrap();
    assert_eq!(output(&console), "AB");
}

#[test]
fn puts_empty() {
    let mut words = assemble(&[
        Ins::pc_rel(Opcode::Lea, Reg::R0, 2),
        Ins::trap(TrapVector::PutS),
        Ins::trap(TrapVector::Halt),
    ]);
    words.extend(string(""));
    let (mut emu, console) = load(&words);
    emu.run().unwrap();
    assert_eq!(output(&console), "");
}

#[test]
fn putsp() {
    let mut words = assemble(&[
        Ins::pc_rel(Opcode::Lea, Reg::R0, 2),
        Ins::trap(TrapVector::PutSp),
        Ins::trap(TrapVector::Halt),
    ]);
    // Low byte first.
    words.extend([u16::from_le_bytes(*b"ab"), u16::from_le_bytes(*b"cd"), 0, u16::from_le_bytes(*b"ef")]);
    let (mut emu, console) = load(&words);
    emu.run().unwrap();
    assert_eq!(output(&console), "abcd");
}

#[test]
fn putsp_odd_length() {
    let mut words = assemble(&[
        Ins::pc_rel(Opcode::Lea, Reg::R0, 2),
        Ins::trap(TrapVector::PutSp),
        Ins::trap(TrapVector::Halt),
    ]);
    words.extend([u16::from_le_bytes(*b"ab"), u16::from(b'c'), u16::from_le_bytes(*b"de")]);
    let (mut emu, console) = load(&words);
    emu.run().unwrap();
    assert_eq!(output(&console), "abc");
}

#[test]
fn getc_echo() {
    let (mut emu, console) = load(&assemble(&[
        Ins::trap(TrapVector::GetC),
        Ins::trap(TrapVector::Out),
        Ins::trap(TrapVector::Halt),
    ]));
    console.write_input(b"k");
    emu.run().unwrap();
    assert_eq!(emu.reg_read(Reg::R0), u16::from(b'k'));
    assert_eq!(output(&console), "k");
    assert_eq!(console.pending_input(), 0);
}

#[test]
fn getc_doesnt_echo() {
    let (mut emu, console) = load(&assemble(&[Ins::trap(TrapVector::GetC), Ins::trap(TrapVector::Halt)]));
    console.write_input(b"xy");
    emu.run().unwrap();
    assert_eq!(emu.reg_read(Reg::R0), u16::from(b'x'));
    assert_eq!(output(&console), "");
    assert_eq!(console.pending_input(), 1);
}

#[test]
fn in_prompts() {
    let (mut emu, console) = load(&assemble(&[Ins::trap(TrapVector::In), Ins::trap(TrapVector::Halt)]));
    console.write_input(b"7");
    emu.run().unwrap();
    assert_eq!(emu.reg_read(Reg::R0), u16::from(b'7'));
    assert!(emu.cond().is_positive());
    assert_eq!(output(&console), format!("{}7", Emulator::IN_PROMPT));
}

#[test]
fn input_exhausted() {
    let (mut emu, _console) = load(&assemble(&[Ins::trap(TrapVector::GetC), Ins::trap(TrapVector::Halt)]));
    assert!(matches!(emu.run(), Err(ExecError::Console(_))));
}

#[test]
fn saves_link() {
    let (mut emu, _) = load(&assemble(&[
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(1)),
        Ins::trap(TrapVector::Out),
    ]));
    emu.run_ins().unwrap();
    emu.run_ins().unwrap();
    assert_eq!(emu.reg_read(Reg::LINK), PC_START + 2);
    assert_eq!(emu.pc(), PC_START + 2);
}

#[test]
fn unknown_vector() {
    let (emu, console) = run(&[
        Ins::Trap(TrapIns { vector: 0x30 }),
        Ins::add(Reg::R0, Reg::R0, Src2::Imm(1)),
        Ins::trap(TrapVector::Halt),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 1);
    assert_eq!(output(&console), "");
}
