//! Audio Fingerprint - acoustic fingerprinting of audio files and buffers.
//!
//! Decodes a file or byte buffer, extracts chroma features and encodes them
//! into a compact sequence of 32-bit codes that survives re-encoding,
//! resampling and channel changes.
//!
//! ```ignore
//! use audio_fingerprint::compute_fingerprint;
//!
//! let fp = compute_fingerprint(Path::new("clip.flac"), 11025, 1)?;
//! println!("{} codes: {}", fp.len(), fp);
//! ```

pub mod audio;
pub mod chroma;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
#[cfg(test)]
pub mod test_utils;

pub use audio::AudioSource;
pub use config::Config;
pub use error::{FingerprintError, Result};
pub use fingerprint::Fingerprint;
pub use pipeline::{
    CancelToken, FingerprintReport, Pipeline, PipelineState, fingerprint_async, fingerprint_batch,
    fingerprint_with_config,
};

/// Fingerprint `input` after converting it to `sample_rate` Hz with
/// `channels` channels.
///
/// Uses the default analysis parameters. Pass
/// [`config::DEFAULT_SAMPLE_RATE`] and [`config::DEFAULT_CHANNELS`] for the
/// standard format.
pub fn compute_fingerprint(
    input: impl Into<AudioSource>,
    sample_rate: u32,
    channels: u16,
) -> Result<Fingerprint> {
    let config = Config::with_format(sample_rate, channels);
    fingerprint_with_config(input, &config, &CancelToken::new()).map(|r| r.fingerprint)
}
