//! Audio resampler using rubato for high-quality sample rate conversion.
//!
//! Converts decoded audio from the source rate (e.g., 44.1kHz) to the
//! analysis rate (11025 Hz by default). The filter delay rubato introduces
//! is trimmed so output sample `n` lines up with input time `n / ratio`,
//! and the flushed tail is cut to exactly `round(input_frames * ratio)`.

use rubato::{FftFixedIn, Resampler as RubatoResampler};

use crate::error::{FingerprintError, Result};

/// Audio resampler wrapper.
pub struct Resampler {
    resampler: Option<FftFixedIn<f32>>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    /// Input buffer for accumulating samples before resampling
    input_buffer: Vec<Vec<f32>>,
    /// Leading output frames still to drop (filter delay)
    skip: usize,
    frames_in: u64,
    frames_out: u64,
}

impl Resampler {
    /// Create a new resampler.
    ///
    /// If input and output rates match, no resampling is performed.
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Result<Self> {
        let channels = channels.max(1) as usize;

        let resampler = if input_rate == output_rate {
            None
        } else {
            // Larger chunks are more efficient; rubato rounds this up as needed
            let chunk_size = 1024;
            let resampler = FftFixedIn::<f32>::new(
                input_rate as usize,
                output_rate as usize,
                chunk_size,
                2,
                channels,
            )
            .map_err(|e| {
                FingerprintError::config(format!(
                    "cannot resample {input_rate}Hz -> {output_rate}Hz: {e}"
                ))
            })?;

            tracing::debug!(
                "Resampler: {}Hz → {}Hz ({} channels)",
                input_rate,
                output_rate,
                channels
            );
            Some(resampler)
        };

        let skip = resampler.as_ref().map_or(0, |r| r.output_delay());

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels,
            input_buffer: vec![Vec::new(); channels],
            skip,
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Check if resampling is needed.
    pub fn needs_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    /// Get the resampling ratio.
    pub fn ratio(&self) -> f64 {
        self.output_rate as f64 / self.input_rate as f64
    }

    /// Process interleaved samples, returning resampled interleaved output.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(input.to_vec());
        };

        for (i, sample) in input.iter().enumerate() {
            self.input_buffer[i % self.channels].push(*sample);
        }
        self.frames_in += (input.len() / self.channels) as u64;

        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.input_buffer[0].len() < needed {
                break;
            }

            let chunks: Vec<Vec<f32>> = self
                .input_buffer
                .iter_mut()
                .map(|ch| ch.drain(..needed).collect())
                .collect();
            let resampled = resampler
                .process(&chunks, None)
                .map_err(|e| FingerprintError::corrupt(format!("resampling failed: {e}")))?;
            self.frames_out += interleave_into(&resampled, &mut self.skip, usize::MAX, &mut output);
        }

        Ok(output)
    }

    /// Flush any remaining samples in the buffer.
    /// Call this at end of stream.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };

        let expected = (self.frames_in as f64 * self.output_rate as f64 / self.input_rate as f64)
            .round() as u64;
        let mut output = Vec::new();

        // Zero-pad until the delayed tail has come out of the filter
        while self.frames_out < expected {
            let needed = resampler.input_frames_next();
            let chunks: Vec<Vec<f32>> = self
                .input_buffer
                .iter_mut()
                .map(|ch| {
                    let mut chunk: Vec<f32> = ch.drain(..).collect();
                    chunk.resize(needed, 0.0);
                    chunk
                })
                .collect();
            let resampled = resampler
                .process(&chunks, None)
                .map_err(|e| FingerprintError::corrupt(format!("resampling failed: {e}")))?;
            let limit = (expected - self.frames_out) as usize;
            self.frames_out += interleave_into(&resampled, &mut self.skip, limit, &mut output);
        }

        for ch in &mut self.input_buffer {
            ch.clear();
        }
        Ok(output)
    }
}

/// Append planar `resampled` to `output` as interleaved frames.
///
/// Drops up to `skip` leading frames and appends at most `limit` frames.
/// Returns the number of frames appended.
fn interleave_into(
    resampled: &[Vec<f32>],
    skip: &mut usize,
    limit: usize,
    output: &mut Vec<f32>,
) -> u64 {
    let Some(first) = resampled.first() else {
        return 0;
    };

    let dropped = (*skip).min(first.len());
    *skip -= dropped;
    let frames = (first.len() - dropped).min(limit);

    output.reserve(frames * resampled.len());
    for frame in dropped..dropped + frames {
        for ch in resampled {
            output.push(ch[frame]);
        }
    }
    frames as u64
}
