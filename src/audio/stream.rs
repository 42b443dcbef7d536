//! Lazy PCM stream in the analysis format.
//!
//! Wraps an [`AudioDecoder`] with channel remixing and resampling so the
//! consumer sees a single forward pass of interleaved `f32` chunks at a
//! fixed rate and channel count.

use std::time::Duration;

use super::{AudioDecoder, AudioSource, Resampler};
use crate::error::{FingerprintError, Result};

/// Single-pass stream of PCM chunks at the target format.
///
/// Not restartable: once drained (or after an error) it yields `None`.
pub struct AudioStream {
    decoder: AudioDecoder,
    resampler: Option<Resampler>,
    sample_rate: u32,
    channels: u16,
    source_channels: Option<u16>,
    limit_frames: Option<u64>,
    frames_emitted: u64,
    finished: bool,
}

impl AudioStream {
    /// Open `source` and convert it to `sample_rate` Hz with `channels` channels.
    pub fn open(source: &AudioSource, sample_rate: u32, channels: u16) -> Result<Self> {
        if !(1..=2).contains(&channels) {
            return Err(FingerprintError::config(format!(
                "channels must be 1 or 2, got {channels}"
            )));
        }

        let decoder = AudioDecoder::open(source)?;
        let resampler = Resampler::new(decoder.sample_rate(), sample_rate, channels)?;
        let source_channels = decoder.channels();

        Ok(Self {
            decoder,
            resampler: Some(resampler),
            sample_rate,
            channels,
            source_channels,
            limit_frames: None,
            frames_emitted: 0,
            finished: false,
        })
    }

    /// Stop after `limit` of audio (measured at the target rate).
    pub fn with_limit(mut self, limit: Option<Duration>) -> Self {
        self.limit_frames = limit.map(|d| (d.as_secs_f64() * self.sample_rate as f64).round() as u64);
        self
    }

    /// Target sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Target channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate of the underlying file.
    pub fn source_sample_rate(&self) -> u32 {
        self.decoder.sample_rate()
    }

    /// Channel count of the underlying file, once known.
    pub fn source_channels(&self) -> Option<u16> {
        self.source_channels
    }

    /// Container-declared total duration (zero when unknown).
    pub fn duration(&self) -> Duration {
        self.decoder.duration()
    }

    /// Frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let Some(resampler) = self.resampler.as_mut() else {
                return Ok(None);
            };

            let output = match self.decoder.next_chunk()? {
                Some(chunk) => {
                    self.source_channels = Some(chunk.channels);
                    let remixed = remix(&chunk.samples, chunk.channels, self.channels);
                    resampler.process(&remixed)?
                }
                None => {
                    self.finished = true;
                    let tail = resampler.flush()?;
                    self.resampler = None;
                    tail
                }
            };

            if let Some(chunk) = self.apply_limit(output) {
                return Ok(Some(chunk));
            }
        }
    }

    /// Truncate `output` to the configured limit; `None` when nothing is left to emit.
    fn apply_limit(&mut self, mut output: Vec<f32>) -> Option<Vec<f32>> {
        let channels = self.channels as usize;
        if let Some(limit) = self.limit_frames {
            let remaining = limit.saturating_sub(self.frames_emitted) as usize;
            if output.len() / channels >= remaining {
                output.truncate(remaining * channels);
                self.finished = true;
                tracing::debug!("Reached analysis limit of {} frames", limit);
            }
        }

        if output.is_empty() {
            return None;
        }
        self.frames_emitted += (output.len() / channels) as u64;
        Some(output)
    }
}

impl Iterator for AudioStream {
    type Item = Result<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Convert interleaved samples between channel layouts.
///
/// Mono output averages every input channel; stereo output duplicates mono
/// input and keeps the front pair of wider layouts.
pub fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let from = from.max(1) as usize;
    let to = to.max(1) as usize;
    if from == to {
        return samples.to_vec();
    }

    let frames = samples.chunks_exact(from);
    match to {
        1 => frames
            .map(|frame| frame.iter().sum::<f32>() / from as f32)
            .collect(),
        _ if from == 1 => frames
            .flat_map(|frame| std::iter::repeat_n(frame[0], to))
            .collect(),
        _ => frames.flat_map(|frame| frame[..to].iter().copied()).collect(),
    }
}
