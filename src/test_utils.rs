//! Test utilities and fixtures for fingerprinting tests.
//!
//! Synthetic audio is generated on the fly and written as 16-bit WAV files
//! into a temporary directory, so no binary fixtures live in the repo.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{sine, write_wav};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = write_wav(dir.path(), "tone.wav", 11025, 1, 30.0, sine(440.0));
//! ```

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// A pure tone at `freq` Hz and 30% amplitude.
pub fn sine(freq: f32) -> impl Fn(f32) -> f32 {
    move |t| 0.3 * (2.0 * PI * freq * t).sin()
}

/// A repeating scale with a fifth above each note.
///
/// Changes pitch every half second, which gives the encoder varied chroma
/// to work with (a steady tone produces a near-constant fingerprint).
pub fn melody() -> impl Fn(f32) -> f32 {
    const NOTES: [f32; 8] = [261.63, 293.66, 329.63, 349.23, 392.0, 440.0, 493.88, 523.25];
    move |t| {
        let idx = ((t * 2.0) as usize + (t / 3.0) as usize) % NOTES.len();
        let f = NOTES[idx];
        0.25 * (2.0 * PI * f * t).sin() + 0.1 * (2.0 * PI * f * 1.5 * t).sin()
    }
}

/// Render `signal` as 16-bit PCM WAV bytes.
pub fn wav_bytes(
    sample_rate: u32,
    channels: u16,
    seconds: f32,
    signal: impl Fn(f32) -> f32,
) -> Vec<u8> {
    wav_bytes_as(sample_rate, channels, seconds, 16, hound::SampleFormat::Int, signal)
}

/// Render `signal` as WAV bytes with the given sample encoding.
///
/// Supports 8/16/24/32-bit integer and 32-bit float samples.
pub fn wav_bytes_as(
    sample_rate: u32,
    channels: u16,
    seconds: f32,
    bits_per_sample: u16,
    sample_format: hound::SampleFormat,
    signal: impl Fn(f32) -> f32,
) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).expect("Failed to create WAV writer");
        let total = (seconds * sample_rate as f32).round() as usize;
        let full_scale = ((1i64 << (bits_per_sample - 1)) - 1) as f32;
        for i in 0..total {
            let t = i as f32 / sample_rate as f32;
            let value = signal(t).clamp(-1.0, 1.0);
            for _ in 0..channels {
                let written = match (sample_format, bits_per_sample) {
                    (hound::SampleFormat::Float, _) => writer.write_sample(value),
                    (hound::SampleFormat::Int, 8) => writer.write_sample((value * full_scale) as i8),
                    (hound::SampleFormat::Int, 16) => {
                        writer.write_sample((value * full_scale) as i16)
                    }
                    (hound::SampleFormat::Int, _) => writer.write_sample((value * full_scale) as i32),
                };
                written.expect("Failed to write sample");
            }
        }
        writer.finalize().expect("Failed to finalize WAV");
    }
    cursor.into_inner()
}

/// A bare 44-byte PCM WAV header, with no validation of its fields.
///
/// For building malformed files hound refuses to write. The caller appends
/// `data_len` bytes of sample data.
pub fn pcm_wav_header(sample_rate: u32, channels: u16, data_len: u32) -> Vec<u8> {
    let block_align = channels * 2;
    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(36 + data_len).to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&channels.to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&16u16.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_len.to_le_bytes());
    header
}

/// Write `signal` as a WAV file named `name` inside `dir`.
pub fn write_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channels: u16,
    seconds: f32,
    signal: impl Fn(f32) -> f32,
) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, wav_bytes(sample_rate, channels, seconds, signal))
        .expect("Failed to write WAV fixture");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_bytes_has_expected_size() {
        let bytes = wav_bytes(8000, 2, 1.0, sine(440.0));
        // 44-byte header + 8000 frames * 2 channels * 2 bytes
        assert_eq!(bytes.len(), 44 + 8000 * 2 * 2);
    }

    #[test]
    fn test_wav_bytes_as_float() {
        let bytes = wav_bytes_as(8000, 1, 1.0, 32, hound::SampleFormat::Float, sine(440.0));
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
        assert_eq!(reader.len(), 8000);
    }

    #[test]
    fn test_pcm_wav_header_layout() {
        let header = pcm_wav_header(22050, 2, 400);
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[24..28], &22050u32.to_le_bytes());
        assert_eq!(&header[40..44], &400u32.to_le_bytes());
    }

    #[test]
    fn test_write_wav_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "a.wav", 11025, 1, 0.5, melody());
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 44);
    }
}
