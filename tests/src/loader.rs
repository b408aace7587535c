use crate::{assemble, image, output};
use common::asm::*;
use common::constants::PC_START;
use emu_lib::io::console::PipeConsole;
use emu_lib::{Emulator, LoadError, StartupError, load_images};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

fn write_image(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn new_emu() -> (Emulator, Arc<PipeConsole>) {
    let console = Arc::new(PipeConsole::default());
    (Emulator::new(console.clone()), console)
}

#[test]
fn no_images() {
    let (mut emu, _console) = new_emu();
    let paths: [PathBuf; 0] = [];
    assert!(matches!(load_images(&mut emu, &paths), Err(StartupError::NoImages)));

    // Nothing ran and nothing changed.
    assert_eq!(emu.num_ins(), 0);
    assert_eq!(emu.pc(), PC_START);
    assert_eq!(emu.cond(), Cond::Zero);
    for reg in [Reg::R0, Reg::R1, Reg::R2, Reg::R3, Reg::R4, Reg::R5, Reg::R6, Reg::R7] {
        assert_eq!(emu.reg_read(reg), 0);
    }
}

#[test]
fn load_and_run() {
    let dir = TempDir::new().unwrap();
    let mut words = assemble(&[
        Ins::pc_rel(Opcode::Lea, Reg::R0, 2),
        Ins::trap(TrapVector::PutS),
        Ins::trap(TrapVector::Halt),
    ]);
    words.extend("hi\n".bytes().map(u16::from));
    words.push(0);
    let path = write_image(dir.path(), "hello.obj", &image(PC_START, &words));

    let (mut emu, console) = new_emu();
    assert_eq!(load_images(&mut emu, &[&path]).unwrap(), 1);
    emu.run_from_start().unwrap();
    assert_eq!(output(&console), "hi\n");
}

#[test]
fn later_images_overwrite() {
    let dir = TempDir::new().unwrap();
    let first = write_image(dir.path(), "a.obj", &image(0x4000, &[1, 2, 3]));
    let second = write_image(dir.path(), "b.obj", &image(0x4001, &[20]));

    let (mut emu, _console) = new_emu();
    assert_eq!(load_images(&mut emu, &[first, second]).unwrap(), 2);
    let state = emu.get_state();
    assert_eq!(state.mem_read(0x4000), 1);
    assert_eq!(state.mem_read(0x4001), 20);
    assert_eq!(state.mem_read(0x4002), 3);
}

#[test]
fn missing_image_skipped() {
    let dir = TempDir::new().unwrap();
    let good = write_image(dir.path(), "good.obj", &image(0x5000, &[0xaaaa]));
    let missing = dir.path().join("missing.obj");

    let (mut emu, _console) = new_emu();
    assert_eq!(load_images(&mut emu, &[missing.clone(), good]).unwrap(), 1);
    assert_eq!(emu.get_state().mem_read(0x5000), 0xaaaa);

    assert!(matches!(emu.load_image_file(&missing), Err(LoadError::NotFound(p)) if p == missing));
}

#[test]
fn nothing_loaded() {
    let dir = TempDir::new().unwrap();
    let (mut emu, _console) = new_emu();
    let paths = [dir.path().join("nope.obj"), dir.path().to_path_buf()];
    assert!(matches!(load_images(&mut emu, &paths), Err(StartupError::NoneLoaded)));
    assert!(matches!(emu.load_image_file(dir.path()), Err(LoadError::NotAFile(_))));
}

#[test]
fn empty_image_counts() {
    let dir = TempDir::new().unwrap();
    let empty = write_image(dir.path(), "empty.obj", &[]);
    let (mut emu, _console) = new_emu();
    assert_eq!(load_images(&mut emu, &[empty]).unwrap(), 1);
}

#[test]
fn truncated_at_top_of_memory() {
    let dir = TempDir::new().unwrap();
    let path = write_image(dir.path(), "top.obj", &image(0xfffe, &[7, 8, 9, 10]));
    let (mut emu, _console) = new_emu();
    let loaded = emu.load_image_file(&path).unwrap().unwrap();
    assert_eq!(loaded.origin, 0xfffe);
    assert_eq!(loaded.len, 2);
    assert_eq!(emu.get_state().mem_read(0xffff), 8);
    assert_eq!(emu.get_state().mem_read(0x0000), 0);
}
