//! Windowed power spectrum using a real-to-complex FFT.

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

use crate::error::{FingerprintError, Result};

/// FFT-based power spectrum analyzer for fixed-size windows.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    size: usize,
    /// Hamming window coefficients
    window: Vec<f32>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for windows of `size` samples.
    pub fn new(size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);

        let window = hamming(size);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Self {
            fft,
            size,
            window,
            input,
            output,
            scratch,
        }
    }

    /// Window length in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of bins in the power spectrum (`size / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.output.len()
    }

    /// Compute |X(k)|² of `samples`, zero-padding to the window length.
    ///
    /// `spectrum` is resized to [`Self::bins`].
    pub fn power_spectrum(&mut self, samples: &[f32], spectrum: &mut Vec<f32>) -> Result<()> {
        let n = samples.len().min(self.size);
        for (dst, (s, w)) in self.input.iter_mut().zip(samples[..n].iter().zip(&self.window)) {
            *dst = s * w;
        }
        self.input[n..].fill(0.0);

        self.fft
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|e| FingerprintError::InvalidState(format!("FFT failed: {e}")))?;

        spectrum.clear();
        spectrum.extend(self.output.iter().map(|c| c.norm_sqr()));
        Ok(())
    }
}

/// Hamming window of `size` coefficients.
fn hamming(size: usize) -> Vec<f32> {
    let denom = (size.max(2) - 1) as f32;
    (0..size)
        .map(|i| 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / denom).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_creation() {
        let analyzer = SpectrumAnalyzer::new(1024);
        assert_eq!(analyzer.size(), 1024);
        assert_eq!(analyzer.bins(), 513);
    }

    #[test]
    fn test_hamming_endpoints() {
        let w = hamming(4096);
        assert!((w[0] - 0.08).abs() < 1e-6);
        assert!((w[2048] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let size = 1024;
        let rate = 8000.0;
        let freq = 1000.0; // bin 128 exactly
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin())
            .collect();

        let mut analyzer = SpectrumAnalyzer::new(size);
        let mut spectrum = Vec::new();
        analyzer.power_spectrum(&samples, &mut spectrum).unwrap();

        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 128);
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(512);
        let mut spectrum = Vec::new();
        analyzer.power_spectrum(&[0.0; 100], &mut spectrum).unwrap();
        assert_eq!(spectrum.len(), 257);
        assert!(spectrum.iter().all(|&e| e == 0.0));
    }
}
