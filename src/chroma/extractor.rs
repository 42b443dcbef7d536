//! Streaming chroma extractor.

use super::{FeatureFrame, FeatureSet, PitchClassMap, SpectrumAnalyzer, normalize};
use crate::config::AnalysisConfig;
use crate::error::{FingerprintError, Result};

/// Number of frames produced for `samples` samples.
///
/// Every sample is covered by at least one window; the last window is
/// zero-padded when it runs past the end.
pub fn frame_count(samples: u64, window: usize, hop: usize) -> u64 {
    let (window, hop) = (window as u64, hop as u64);
    match samples {
        0 => 0,
        n if n <= window => 1,
        n => 1 + (n - window).div_ceil(hop),
    }
}

/// Consumes PCM chunks and emits one [`FeatureFrame`] per analysis window.
pub struct ChromaExtractor {
    analyzer: SpectrumAnalyzer,
    pitch: PitchClassMap,
    window_size: usize,
    hop_size: usize,
    sample_rate: u32,
    channels: usize,
    silence_threshold: f32,
    min_samples: u64,
    max_samples: Option<u64>,
    /// Mono samples not yet fully consumed by a window
    pending: Vec<f32>,
    /// Offset of `pending[0]`
    pending_offset: u64,
    sample_count: u64,
    frames: Vec<FeatureFrame>,
    silent_frames: usize,
    spectrum: Vec<f32>,
}

impl ChromaExtractor {
    /// Create an extractor for interleaved input with `channels` channels at
    /// `sample_rate` Hz.
    pub fn new(config: &AnalysisConfig, sample_rate: u32, channels: u16) -> Result<Self> {
        if config.window_size == 0 || config.hop_size == 0 || config.hop_size > config.window_size {
            return Err(FingerprintError::config(format!(
                "invalid window/hop {}/{}",
                config.window_size, config.hop_size
            )));
        }

        let pitch = PitchClassMap::new(
            config.window_size,
            sample_rate,
            config.min_freq,
            config.max_freq,
        );
        if pitch.bin_range().is_empty() {
            return Err(FingerprintError::config(format!(
                "no FFT bins between {} and {} Hz at {} Hz",
                config.min_freq, config.max_freq, sample_rate
            )));
        }

        let min_samples = (config.min_duration_secs * sample_rate as f64).ceil() as u64;
        let max_samples = config
            .max_duration_secs
            .map(|secs| (secs * sample_rate as f64).round() as u64);

        Ok(Self {
            analyzer: SpectrumAnalyzer::new(config.window_size),
            pitch,
            window_size: config.window_size,
            hop_size: config.hop_size,
            sample_rate,
            channels: channels.max(1) as usize,
            silence_threshold: config.silence_threshold,
            min_samples,
            max_samples,
            pending: Vec::with_capacity(config.window_size * 2),
            pending_offset: 0,
            sample_count: 0,
            frames: Vec::new(),
            silent_frames: 0,
            spectrum: Vec::new(),
        })
    }

    /// Raise the minimum number of samples accepted by [`Self::finish`].
    pub fn require_samples(mut self, samples: u64) -> Self {
        self.min_samples = self.min_samples.max(samples);
        self
    }

    /// Samples accepted so far.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Frames emitted so far.
    pub fn frames(&self) -> &[FeatureFrame] {
        &self.frames
    }

    /// Whether the analysis limit has been reached.
    pub fn is_full(&self) -> bool {
        self.max_samples.is_some_and(|max| self.sample_count >= max)
    }

    /// Feed interleaved samples.
    pub fn push(&mut self, interleaved: &[f32]) -> Result<()> {
        let mut frames = interleaved.len() / self.channels;
        if let Some(max) = self.max_samples {
            frames = frames.min(max.saturating_sub(self.sample_count) as usize);
        }
        if frames == 0 {
            return Ok(());
        }

        let input = &interleaved[..frames * self.channels];
        if self.channels == 1 {
            self.pending.extend_from_slice(input);
        } else {
            let scale = 1.0 / self.channels as f32;
            self.pending.extend(
                input
                    .chunks_exact(self.channels)
                    .map(|frame| frame.iter().sum::<f32>() * scale),
            );
        }
        self.sample_count += frames as u64;

        while self.pending.len() >= self.window_size {
            self.emit_frame()?;
            self.pending.drain(..self.hop_size);
            self.pending_offset += self.hop_size as u64;
        }
        Ok(())
    }

    /// Flush the final partial window and return every frame.
    pub fn finish(mut self) -> Result<FeatureSet> {
        if self.sample_count < self.min_samples {
            return Err(FingerprintError::InsufficientAudio {
                duration_secs: self.sample_count as f64 / self.sample_rate as f64,
                required_secs: self.min_samples as f64 / self.sample_rate as f64,
            });
        }

        // Samples past the end of the last full window still need a frame
        let uncovered = if self.frames.is_empty() {
            self.pending.len()
        } else {
            self.pending
                .len()
                .saturating_sub(self.window_size - self.hop_size)
        };
        if uncovered > 0 {
            self.emit_frame()?;
        }

        tracing::debug!(
            "Extracted {} frames ({} silent) from {} samples",
            self.frames.len(),
            self.silent_frames,
            self.sample_count
        );

        Ok(FeatureSet {
            frames: self.frames,
            sample_count: self.sample_count,
            sample_rate: self.sample_rate,
        })
    }

    /// Analyse the window at the head of `pending` (zero-padded if short).
    fn emit_frame(&mut self) -> Result<()> {
        let end = self.pending.len().min(self.window_size);
        self.analyzer
            .power_spectrum(&self.pending[..end], &mut self.spectrum)?;

        let mut bins = self.pitch.fold(&self.spectrum);
        if normalize(&mut bins, self.silence_threshold) {
            self.silent_frames += 1;
        }

        self.frames.push(FeatureFrame {
            offset: self.pending_offset,
            bins,
        });
        Ok(())
    }
}
