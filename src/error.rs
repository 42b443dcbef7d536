//! Error types for the fingerprinting core.
//!
//! Every failure the pipeline can hit is surfaced as a [`FingerprintError`].
//! There is no partial-success mode: callers get a complete fingerprint or
//! one of these errors, never a placeholder value.
//!
//! The binary wraps these in `anyhow` at the top level.
//!
//! # Example
//!
//! ```ignore
//! use audio_fingerprint::{compute_fingerprint, FingerprintError};
//!
//! match compute_fingerprint(Path::new("clip.wav"), 11025, 1) {
//!     Ok(fp) => println!("{fp}"),
//!     Err(FingerprintError::InsufficientAudio { .. }) => eprintln!("record longer"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use std::path::PathBuf;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, FingerprintError>;

/// Failure of a fingerprinting request.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// The underlying file or stream could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be opened
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container or codec not recognised
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The stream was recognised but could not be parsed
    #[error("Corrupt audio data: {0}")]
    CorruptData(String),

    /// Too little audio to derive a stable fingerprint
    #[error("Insufficient audio: {duration_secs:.2}s decoded, at least {required_secs:.2}s required")]
    InsufficientAudio {
        duration_secs: f64,
        required_secs: f64,
    },

    /// The extractor produced no feature frames
    #[error("No feature frames to encode")]
    EmptyFeatureSet,

    /// The request was cancelled by the caller
    #[error("Fingerprinting cancelled")]
    Cancelled,

    /// Configuration values that cannot produce a fingerprint
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A compact fingerprint string could not be decoded
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// A pipeline was driven out of order
    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),

    /// A background task panicked or was aborted
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl FingerprintError {
    /// Create an unsupported-format error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(message.into())
    }

    /// Create a corrupt-data error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptData(message.into())
    }

    /// Create an invalid-config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an open error for a path.
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was caused by the input itself.
    ///
    /// Input errors are deterministic: retrying with the same input fails
    /// the same way.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::CorruptData(_)
                | Self::InsufficientAudio { .. }
                | Self::EmptyFeatureSet
        )
    }

    /// Short machine-readable kind, used for host-side error mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Open { .. } => "IOError",
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::CorruptData(_) => "CorruptData",
            Self::InsufficientAudio { .. } => "InsufficientAudio",
            Self::EmptyFeatureSet => "EmptyFeatureSet",
            Self::Cancelled => "Cancelled",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::InvalidFingerprint(_) => "InvalidFingerprint",
            Self::InvalidState(_) => "InvalidState",
            Self::TaskJoin(_) => "TaskJoin",
        }
    }
}
