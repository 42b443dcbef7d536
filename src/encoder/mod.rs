//! Fingerprint encoder.
//!
//! Turns a sequence of chroma frames into 32-bit sub-fingerprints:
//!
//! 1. Smooth the frames over time with a 5-tap filter and re-normalise.
//! 2. Build an integral image of the smoothed `frames × 12` matrix.
//! 3. Slide a 16-frame super-frame over it; at each position run the 16
//!    classifiers and concatenate their 2-bit Gray codes into one `u32`.
//!
//! The output is a pure function of the input frames.

mod classifier;
pub mod compact;
mod image;

pub use classifier::{CLASSIFIERS, Classifier, Filter, FilterKind, Quantizer, gray_code};
pub use image::IntegralImage;

use rayon::prelude::*;

use crate::chroma::{FeatureFrame, NUM_BANDS, normalize};
use crate::error::{FingerprintError, Result};
use crate::fingerprint::Fingerprint;

/// Temporal smoothing taps applied before classification.
pub const SMOOTHING_TAPS: [f32; 5] = [0.25, 0.75, 1.0, 0.75, 0.25];

/// Norm below which a smoothed frame is treated as silence.
const SMOOTHED_SILENCE: f32 = 0.01;

/// Encodes feature frames with a classifier bank.
#[derive(Debug, Clone)]
pub struct FingerprintEncoder {
    classifiers: &'static [Classifier],
    /// Seconds per frame, for error reporting
    frame_secs: f64,
}

impl Default for FingerprintEncoder {
    fn default() -> Self {
        Self::new(1365.0 / 11025.0)
    }
}

impl FingerprintEncoder {
    /// Encoder for frames spaced `frame_secs` apart.
    pub fn new(frame_secs: f64) -> Self {
        Self {
            classifiers: &CLASSIFIERS,
            frame_secs,
        }
    }

    /// Width of one super-frame in smoothed frames.
    pub fn super_frame_width(&self) -> usize {
        classifier::max_width(self.classifiers)
    }

    /// Fewest input frames that yield one code.
    pub fn frames_required(&self) -> usize {
        SMOOTHING_TAPS.len() - 1 + self.super_frame_width()
    }

    /// Number of codes produced from `frames` input frames.
    pub fn code_count(&self, frames: usize) -> usize {
        (frames + 1).saturating_sub(self.frames_required())
    }

    /// Encode `frames` into a fingerprint.
    pub fn encode(&self, frames: &[FeatureFrame]) -> Result<Fingerprint> {
        if frames.is_empty() {
            return Err(FingerprintError::EmptyFeatureSet);
        }
        let required = self.frames_required();
        if frames.len() < required {
            return Err(FingerprintError::InsufficientAudio {
                duration_secs: frames.len() as f64 * self.frame_secs,
                required_secs: required as f64 * self.frame_secs,
            });
        }

        let smoothed = smooth(frames);
        let image = IntegralImage::new(&smoothed);
        let positions = image.rows() + 1 - self.super_frame_width();

        let codes: Vec<u32> = (0..positions)
            .into_par_iter()
            .map(|offset| self.sub_fingerprint(&image, offset))
            .collect();

        tracing::debug!("Encoded {} frames into {} codes", frames.len(), codes.len());
        Ok(Fingerprint::new(codes))
    }

    fn sub_fingerprint(&self, image: &IntegralImage, offset: usize) -> u32 {
        self.classifiers
            .iter()
            .fold(0u32, |bits, c| (bits << 2) | c.classify(image, offset))
    }
}

/// Apply [`SMOOTHING_TAPS`] across time and re-normalise each row.
///
/// Produces `frames.len() - 4` rows.
fn smooth(frames: &[FeatureFrame]) -> Vec<[f32; NUM_BANDS]> {
    frames
        .windows(SMOOTHING_TAPS.len())
        .map(|window| {
            let mut row = [0.0f32; NUM_BANDS];
            for (frame, &tap) in window.iter().zip(&SMOOTHING_TAPS) {
                for (acc, &b) in row.iter_mut().zip(&frame.bins) {
                    *acc += tap * b;
                }
            }
            normalize(&mut row, SMOOTHED_SILENCE);
            row
        })
        .collect()
}
