//! Audio inputs: files on disk or in-memory buffers.

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;

use crate::error::{FingerprintError, Result};

/// Where the audio to fingerprint comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// A file on disk
    Path(PathBuf),
    /// A complete encoded file held in memory
    Bytes(Vec<u8>),
}

impl AudioSource {
    /// Human-readable label for logs.
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }

    /// Open the source as a symphonia media stream plus a format hint.
    ///
    /// Empty inputs are rejected here as corrupt rather than handed to the
    /// prober, which would otherwise report them as an unknown format.
    pub(crate) fn open(&self) -> Result<(MediaSourceStream, Hint)> {
        let mut hint = Hint::new();

        match self {
            Self::Path(path) => {
                let file = File::open(path).map_err(|e| FingerprintError::open(path, e))?;
                if file.metadata()?.len() == 0 {
                    return Err(FingerprintError::corrupt(format!(
                        "{} is empty",
                        path.display()
                    )));
                }
                if let Some(ext) = path.extension() {
                    hint.with_extension(&ext.to_string_lossy());
                }
                let mss = MediaSourceStream::new(Box::new(file), Default::default());
                Ok((mss, hint))
            }
            Self::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(FingerprintError::corrupt("input buffer is empty"));
                }
                let cursor = Cursor::new(bytes.clone());
                let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
                Ok((mss, hint))
            }
        }
    }
}

impl From<&Path> for AudioSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&PathBuf> for AudioSource {
    fn from(path: &PathBuf) -> Self {
        Self::Path(path.clone())
    }
}

impl From<Vec<u8>> for AudioSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for AudioSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}
