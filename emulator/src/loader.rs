use common::constants::MEM_WORDS;
use common::misc::from_big_endian;
use crate::Emulator;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{}: no such file", .0.display())]
    NotFound(PathBuf),

    #[error("{}: not a regular file", .0.display())]
    NotAFile(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("No image files given")]
    NoImages,

    #[error("None of the image files could be loaded")]
    NoneLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedImage {
    pub origin: u16,
    pub len: usize, // Words actually written
}

impl Emulator {
    // `data` is an image: a big-endian origin word followed by big-endian
    // words to place there. Words that would run past the end of memory are
    // dropped, as is a trailing odd byte. None if there isn't even an origin.
    pub fn load_image(&mut self, data: &[u8]) -> Option<LoadedImage> {
        let mut words = data
            .chunks_exact(2)
            .map(|pair| from_big_endian(u16::from_ne_bytes([pair[0], pair[1]])));

        let origin = words.next()?;
        let max_words = MEM_WORDS - usize::from(origin);
        let words: Vec<u16> = words.take(max_words).collect();
        self.get_state_mut().mem_write_slice(origin, &words);

        Some(LoadedImage { origin, len: words.len() })
    }

    pub fn load_image_file(&mut self, path: &Path) -> Result<Option<LoadedImage>, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(LoadError::NotAFile(path.to_path_buf()));
        }
        let data = fs::read(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        Ok(self.load_image(&data))
    }
}

// Loads every image in order, later ones overwriting earlier ones where they
// overlap. A file that fails to load is reported and skipped. Returns how many
// loaded.
pub fn load_images<P: AsRef<Path>>(emu: &mut Emulator, paths: &[P]) -> Result<usize, StartupError> {
    if paths.is_empty() {
        return Err(StartupError::NoImages);
    }

    let mut loaded = 0usize;
    for path in paths {
        let path = path.as_ref();
        match emu.load_image_file(path) {
            Ok(Some(image)) => {
                info!(
                    "Loaded {}: {} words at {:#06x}",
                    path.display(),
                    image.len,
                    image.origin,
                );
                loaded += 1;
            }
            Ok(None) => {
                warn!("{}: shorter than one word, nothing loaded", path.display());
                loaded += 1;
            }
            Err(err) => error!("Skipping image: {err}"),
        }
    }

    if loaded == 0 {
        return Err(StartupError::NoneLoaded);
    }
    Ok(loaded)
}
