//! Mapping from FFT bins to the 12 pitch classes.

use super::NUM_BANDS;

/// Reference frequency of pitch class 0 (A0).
const REFERENCE_FREQ: f64 = 440.0 / 16.0;

/// Precomputed pitch class for every FFT bin inside the analysed range.
#[derive(Debug, Clone)]
pub struct PitchClassMap {
    min_index: usize,
    /// Band of bin `min_index + i`
    bands: Vec<u8>,
}

impl PitchClassMap {
    /// Build the map for a `window`-sample FFT at `sample_rate` Hz covering
    /// `min_freq..max_freq`.
    pub fn new(window: usize, sample_rate: u32, min_freq: f32, max_freq: f32) -> Self {
        let freq_to_index = |freq: f32| (window as f64 * freq as f64 / sample_rate as f64).round() as usize;

        let min_index = freq_to_index(min_freq).max(1);
        let max_index = freq_to_index(max_freq).min(window / 2);

        let bands = (min_index..max_index.max(min_index))
            .map(|i| {
                let freq = i as f64 * sample_rate as f64 / window as f64;
                let octave = (freq / REFERENCE_FREQ).log2();
                let note = NUM_BANDS as f64 * (octave - octave.floor());
                (note as usize).min(NUM_BANDS - 1) as u8
            })
            .collect();

        Self { min_index, bands }
    }

    /// FFT bins covered, as a half-open range.
    pub fn bin_range(&self) -> std::ops::Range<usize> {
        self.min_index..self.min_index + self.bands.len()
    }

    /// Pitch class of FFT bin `index`, if it lies inside the analysed range.
    pub fn band_of(&self, index: usize) -> Option<usize> {
        index
            .checked_sub(self.min_index)
            .and_then(|i| self.bands.get(i))
            .map(|&b| b as usize)
    }

    /// Sum the energy of each pitch class.
    pub fn fold(&self, spectrum: &[f32]) -> [f32; NUM_BANDS] {
        let mut bins = [0.0f32; NUM_BANDS];
        let end = (self.min_index + self.bands.len()).min(spectrum.len());
        if end <= self.min_index {
            return bins;
        }
        for (&energy, &band) in spectrum[self.min_index..end].iter().zip(&self.bands) {
            bins[band as usize] += energy;
        }
        bins
    }
}
