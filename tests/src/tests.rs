#![cfg(test)]

mod branch;
mod condition_code;
mod io;
mod jmp;
mod load_store;
mod loader;
mod operate;
mod progs;
mod trap;

use common::asm::Ins;
use common::constants::PC_START;
use emu_lib::Emulator;
use emu_lib::io::console::PipeConsole;

use std::sync::Arc;

// An image file's bytes: origin, then the words, all big-endian.
pub fn image(origin: u16, words: &[u16]) -> Vec<u8> {
    std::iter::once(origin)
        .chain(words.iter().copied())
        .flat_map(u16::to_be_bytes)
        .collect()
}

pub fn assemble(prog: &[Ins]) -> Vec<u16> {
    prog.iter().map(Ins::encode).collect()
}

// Loads `words` at PC_START through the image loader, ready to run.
pub fn load(words: &[u16]) -> (Emulator, Arc<PipeConsole>) {
    let console = Arc::new(PipeConsole::default());
    let mut emu = Emulator::new(console.clone());
    emu.load_image(&image(PC_START, words)).unwrap();
    emu.reset(PC_START);
    (emu, console)
}

// Runs to a halt, which the program is expected to reach.
pub fn run(prog: &[Ins]) -> (Emulator, Arc<PipeConsole>) {
    let (mut emu, console) = load(&assemble(prog));
    emu.run().unwrap();
    assert!(!emu.is_running());
    (emu, console)
}

// Program output without the halt message.
pub fn output(console: &PipeConsole) -> String {
    let out = console.take_output_string();
    match out.strip_suffix(Emulator::HALT_MESSAGE) {
        Some(out) => out.to_string(),
        None => out,
    }
}
