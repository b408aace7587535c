use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read, Write, stdin, stdout};
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::{debug, error, trace};

// The keyboard and display the running program talks to.
pub trait Console: Send + Sync {
    // Returns immediately, with a character if one is waiting.
    fn poll_input(&self) -> io::Result<Option<u8>>;

    // Blocks until a character is available.
    fn read_input(&self) -> io::Result<u8>;

    fn write_output(&self, bytes: &[u8]) -> io::Result<()>;
    fn flush(&self) -> io::Result<()>;
}

////////////////////////////////////////////////////////////////////////////////

fn input_exhausted() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "console input exhausted")
}

// Bytes from a pipe or file. A reader thread feeds a channel, so polling only
// sees what has already arrived and never blocks.
pub struct StreamInput {
    rx: Mutex<Receiver<u8>>,
}

impl StreamInput {
    pub fn spawn(mut source: impl Read + Send + 'static) -> Self {
        let (tx, rx) = channel();
        thread::spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match source.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if buf[..n].iter().any(|byte| tx.send(*byte).is_err()) {
                            break;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        error!("Console: reading input failed: {err}");
                        break;
                    }
                }
            }
            debug!("Console: end of input");
        });
        StreamInput { rx: Mutex::new(rx) }
    }

    // Once the source is exhausted this keeps reporting no input.
    pub fn poll(&self) -> Option<u8> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.try_recv() {
            Ok(byte) => Some(byte),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn read(&self) -> io::Result<u8> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        rx.recv().map_err(|_| input_exhausted())
    }
}

////////////////////////////////////////////////////////////////////////////////

type InterruptHook = Box<dyn Fn() + Send + Sync>;

enum Input {
    // Key events through crossterm.
    Terminal,
    Stream(StreamInput),
}

// The process's own stdin and stdout. Keys come through crossterm's event
// queue when stdin is a terminal, and straight from stdin otherwise.
pub struct StdConsole {
    input: Input,
    on_interrupt: Option<InterruptHook>,
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl StdConsole {
    const ENTER: u8 = b'\n';
    const TAB: u8 = b'\t';
    const BACKSPACE: u8 = 0x7f;
    const ESC: u8 = 0x1b;
    const CTRL_MASK: u8 = 0x1f;

    pub fn new() -> Self {
        StdConsole { input: Self::std_input(), on_interrupt: None }
    }

    // In raw mode ctrl-c arrives as a key press rather than a signal; `hook`
    // runs when it does.
    pub fn with_interrupt_hook(hook: impl Fn() + Send + Sync + 'static) -> Self {
        StdConsole { input: Self::std_input(), on_interrupt: Some(Box::new(hook)) }
    }

    // Reads `source` instead of stdin. Never interactive.
    pub fn from_reader(source: impl Read + Send + 'static) -> Self {
        StdConsole { input: Input::Stream(StreamInput::spawn(source)), on_interrupt: None }
    }

    fn std_input() -> Input {
        if stdin().is_terminal() {
            Input::Terminal
        } else {
            debug!("Console: stdin isn't a terminal, reading it directly");
            Input::Stream(StreamInput::spawn(stdin()))
        }
    }

    // Whether input comes from a terminal, and so raw mode is worth having.
    pub fn is_interactive(&self) -> bool {
        matches!(self.input, Input::Terminal)
    }

    fn interrupted(&self) -> io::Error {
        if let Some(hook) = &self.on_interrupt {
            hook();
        }
        io::Error::new(io::ErrorKind::Interrupted, "interrupted from the console")
    }

    fn translate(&self, key: KeyEvent) -> io::Result<Option<u8>> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let byte = match key.code {
            KeyCode::Char('c') if ctrl => return Err(self.interrupted()),
            KeyCode::Char(ch) if ch.is_ascii() && ctrl => Some(ch as u8 & Self::CTRL_MASK),
            KeyCode::Char(ch) if ch.is_ascii() => Some(ch as u8),
            KeyCode::Enter => Some(Self::ENTER),
            KeyCode::Tab => Some(Self::TAB),
            KeyCode::Backspace => Some(Self::BACKSPACE),
            KeyCode::Esc => Some(Self::ESC),
            _ => None,
        };
        trace!("Console: key {:?} -> {byte:?}", key.code);
        Ok(byte)
    }
}

impl Console for StdConsole {
    fn poll_input(&self) -> io::Result<Option<u8>> {
        if let Input::Stream(stream) = &self.input {
            return Ok(stream.poll());
        }
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if let Some(byte) = self.translate(key)? {
                    return Ok(Some(byte));
                }
            }
        }
        Ok(None)
    }

    fn read_input(&self) -> io::Result<u8> {
        if let Input::Stream(stream) = &self.input {
            return stream.read();
        }
        loop {
            if let Event::Key(key) = event::read()? {
                if let Some(byte) = self.translate(key)? {
                    return Ok(byte);
                }
            }
        }
    }

    fn write_output(&self, bytes: &[u8]) -> io::Result<()> {
        let mut out = stdout().lock();
        if !terminal::is_raw_mode_enabled()? {
            return out.write_all(bytes);
        }

        // Raw mode also turns off output processing, so newlines need an
        // explicit carriage return.
        for line in bytes.split_inclusive(|b| *b == b'\n') {
            match line.split_last() {
                Some((&b'\n', rest)) => {
                    out.write_all(rest)?;
                    out.write_all(b"\r\n")?;
                }
                _ => out.write_all(line)?,
            }
        }
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        stdout().flush()
    }
}

////////////////////////////////////////////////////////////////////////////////

// In-memory console. Tests push input and take whatever the program printed.
#[derive(Default)]
pub struct PipeConsole {
    out_buf: Mutex<VecDeque<u8>>,
    in_buf: Mutex<VecDeque<u8>>,
}

impl PipeConsole {
    pub fn take_output(&self) -> VecDeque<u8> {
        let mut out = self.out_buf.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *out)
    }

    pub fn take_output_string(&self) -> String {
        let out: Vec<u8> = self.take_output().into();
        String::from_utf8_lossy(&out).into_owned()
    }

    pub fn is_out_empty(&self) -> bool {
        self.out_buf.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    pub fn push_input(&self, val: u8) {
        self.in_buf.lock().unwrap_or_else(PoisonError::into_inner).push_back(val);
    }

    pub fn write_input(&self, vals: &[u8]) {
        for val in vals.iter() {
            self.push_input(*val);
        }
    }

    pub fn pending_input(&self) -> usize {
        self.in_buf.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Console for PipeConsole {
    fn poll_input(&self) -> io::Result<Option<u8>> {
        Ok(self.in_buf.lock().unwrap_or_else(PoisonError::into_inner).pop_front())
    }

    // Nothing more will ever arrive, so an empty queue is end of input.
    fn read_input(&self) -> io::Result<u8> {
        self.poll_input()?.ok_or_else(input_exhausted)
    }

    fn write_output(&self, bytes: &[u8]) -> io::Result<()> {
        self.out_buf.lock().unwrap_or_else(PoisonError::into_inner).extend(bytes);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}
