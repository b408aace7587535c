pub mod emulator;
pub mod emulator_state;
pub mod io;
pub mod loader;
mod trap;

pub use emulator::{Emulator, ExecError, ExecRet};
pub use emulator_state::EmulatorState;
pub use io::MMIOHandler;
pub use loader::{LoadError, LoadedImage, StartupError, load_images};
