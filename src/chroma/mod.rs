//! Chroma feature extraction.
//!
//! Overlapping analysis windows are transformed with a Hamming-windowed FFT
//! and their energy folded onto the 12 pitch classes:
//!
//! ```text
//! PCM ──► window (4096, hop 1365) ──► |FFT|² ──► 12 pitch classes ──► normalise ──► FeatureFrame
//! ```

mod extractor;
mod pitch;
mod spectrum;

pub use extractor::{ChromaExtractor, frame_count};
pub use pitch::PitchClassMap;
pub use spectrum::SpectrumAnalyzer;

use serde::{Deserialize, Serialize};

/// Number of pitch classes per frame.
pub const NUM_BANDS: usize = 12;

/// Chroma vector of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    /// Start of the window, in samples at the analysis rate
    pub offset: u64,
    /// Normalised pitch-class energies (all zero for silence)
    pub bins: [f32; NUM_BANDS],
}

impl FeatureFrame {
    /// Whether the frame was below the silence threshold.
    pub fn is_silent(&self) -> bool {
        self.bins.iter().all(|&b| b == 0.0)
    }
}

/// Output of a complete extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// Frames in time order
    pub frames: Vec<FeatureFrame>,
    /// Mono samples analysed
    pub sample_count: u64,
    /// Analysis sample rate
    pub sample_rate: u32,
}

impl FeatureSet {
    /// Seconds of audio analysed.
    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate as f64
    }
}

/// Scale `bins` to unit Euclidean norm.
///
/// Vectors whose norm is below `threshold` are zeroed instead. Returns
/// `true` when the vector was zeroed.
pub fn normalize(bins: &mut [f32; NUM_BANDS], threshold: f32) -> bool {
    let norm = bins.iter().map(|b| b * b).sum::<f32>().sqrt();
    if norm < threshold || norm == 0.0 {
        bins.fill(0.0);
        return true;
    }
    for b in bins.iter_mut() {
        *b /= norm;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_norm() {
        let mut bins = [0.0; NUM_BANDS];
        bins[0] = 3.0;
        bins[4] = 4.0;
        assert!(!normalize(&mut bins, 0.01));
        assert!((bins[0] - 0.6).abs() < 1e-6);
        assert!((bins[4] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zeroes_quiet_frames() {
        let mut bins = [0.001; NUM_BANDS];
        assert!(normalize(&mut bins, 0.01));
        let frame = FeatureFrame { offset: 0, bins };
        assert!(frame.is_silent());
    }

    #[test]
    fn test_feature_set_duration() {
        let set = FeatureSet {
            frames: Vec::new(),
            sample_count: 22050,
            sample_rate: 11025,
        };
        assert_eq!(set.duration_secs(), 2.0);
    }
}
