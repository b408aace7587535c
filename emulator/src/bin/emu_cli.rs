use emu_lib::io::console::StdConsole;
use emu_lib::io::terminal::RawTerminal;
use emu_lib::{Emulator, StartupError, load_images};

use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use env_logger::Env;
use log::{error, warn};


// 128 + SIGINT, as a shell would report it.
const INTERRUPT_EXIT_CODE: i32 = 130;

/// LC-3 Emulator
#[derive(Parser)]
#[command(about)]
struct Args {
    /// Image files to load, in order. Later images overwrite earlier ones.
    images: Vec<PathBuf>,

    /// Address at which to start executing.
    #[arg(long, default_value = "0x3000", value_parser = parse_addr)]
    start: u16,
}

fn parse_addr(input: &str) -> Result<u16, ParseIntError> {
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse(),
    }
}


fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let mut terminal = RawTerminal::new();
    let restore = terminal.restore_handle();
    let console = StdConsole::with_interrupt_hook(move || {
        if let Err(err) = restore.restore() {
            error!("Failed to restore terminal: {err}");
        }
        eprintln!("\nInterrupted");
        std::process::exit(INTERRUPT_EXIT_CODE);
    });

    let interactive = console.is_interactive();
    let mut emu = Emulator::new(Arc::new(console));
    match load_images(&mut emu, &args.images) {
        Ok(_) => (),
        Err(StartupError::NoImages) => {
            eprintln!("{}", Args::command().render_usage());
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    }

    // Piped input has no terminal to configure.
    if interactive {
        if let Err(err) = terminal.enable() {
            warn!("Unable to put the terminal in raw mode: {err}");
        }
    }

    let res = emu.run_at(args.start);
    drop(terminal);

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
