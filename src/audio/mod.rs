//! Audio decoding front end.
//!
//! Turns a file path or byte buffer into a lazy stream of PCM chunks at the
//! analysis format:
//!
//! ```text
//! AudioSource ──► AudioDecoder (symphonia) ──► remix ──► Resampler (rubato) ──► chunks
//! ```

mod decoder;
mod resampler;
mod source;
mod stream;

pub use decoder::{AudioDecoder, DecodedChunk, MIN_SOURCE_RATE};
pub use resampler::Resampler;
pub use source::AudioSource;
pub use stream::{AudioStream, remix};
