pub const MEM_WORDS: usize = 1 << 16;

// Where execution begins after a reset.
pub const PC_START: u16 = 0x3000;

// Keyboard status register. Bit 15 is set when a character is waiting in KBDR.
pub const KBSR: u16 = 0xfe00;
pub const KBSR_READY: u16 = 0x1 << 15;

// Keyboard data register
pub const KBDR: u16 = 0xfe02;
