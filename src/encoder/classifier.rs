//! Rectangular filters and the trained classifier bank.
//!
//! Each classifier compares the energy of two regions of a 12-band ×
//! N-frame patch, squeezes the log-ratio through three thresholds and
//! yields a 2-bit code.

use super::IntegralImage;

/// How a filter splits its rectangle into the two compared regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Whole rectangle against nothing
    Area,
    /// Upper half of the bands against the lower half
    BandHalves,
    /// Later half of the frames against the earlier half
    TimeHalves,
    /// Anti-diagonal quadrants against the diagonal ones
    Quadrants,
    /// Middle third of the bands against the outer thirds
    BandThirds,
    /// Middle third of the frames against the outer thirds
    TimeThirds,
}

/// A rectangle anchored at `band`, `height` bands tall and `width` frames wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub kind: FilterKind,
    pub band: usize,
    pub height: usize,
    pub width: usize,
}

impl Filter {
    pub const fn new(kind: FilterKind, band: usize, height: usize, width: usize) -> Self {
        Self {
            kind,
            band,
            height,
            width,
        }
    }

    /// Response of the filter with its left edge at `frame`.
    ///
    /// Caller guarantees `frame + width <= image.rows()`.
    pub fn apply(&self, image: &IntegralImage, frame: usize) -> f64 {
        let (x, y, w, h) = (frame, self.band, self.width, self.height);
        let area = |x1, y1, x2, y2| image.area(x1, y1, x2, y2);

        let (a, b) = match self.kind {
            FilterKind::Area => (area(x, y, x + w, y + h), 0.0),
            FilterKind::BandHalves => {
                let h2 = h / 2;
                (area(x, y + h2, x + w, y + h), area(x, y, x + w, y + h2))
            }
            FilterKind::TimeHalves => {
                let w2 = w / 2;
                (area(x + w2, y, x + w, y + h), area(x, y, x + w2, y + h))
            }
            FilterKind::Quadrants => {
                let (w2, h2) = (w / 2, h / 2);
                (
                    area(x, y + h2, x + w2, y + h) + area(x + w2, y, x + w, y + h2),
                    area(x, y, x + w2, y + h2) + area(x + w2, y + h2, x + w, y + h),
                )
            }
            FilterKind::BandThirds => {
                let h3 = h / 3;
                (
                    area(x, y + h3, x + w, y + 2 * h3),
                    area(x, y, x + w, y + h3) + area(x, y + 2 * h3, x + w, y + h),
                )
            }
            FilterKind::TimeThirds => {
                let w3 = w / 3;
                (
                    area(x + w3, y, x + 2 * w3, y + h),
                    area(x, y, x + w3, y + h) + area(x + 2 * w3, y, x + w, y + h),
                )
            }
        };

        ((1.0 + a) / (1.0 + b)).ln()
    }
}

/// Three ascending thresholds splitting a response into four levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    pub t0: f64,
    pub t1: f64,
    pub t2: f64,
}

impl Quantizer {
    pub const fn new(t0: f64, t1: f64, t2: f64) -> Self {
        Self { t0, t1, t2 }
    }

    /// Level 0..=3 of `value`.
    pub fn quantize(&self, value: f64) -> u8 {
        if value < self.t1 {
            if value < self.t0 { 0 } else { 1 }
        } else if value < self.t2 {
            2
        } else {
            3
        }
    }
}

/// A filter with its trained quantizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    pub filter: Filter,
    pub quantizer: Quantizer,
}

impl Classifier {
    pub const fn new(filter: Filter, quantizer: Quantizer) -> Self {
        Self { filter, quantizer }
    }

    /// Gray-coded 2-bit output at `frame`.
    pub fn classify(&self, image: &IntegralImage, frame: usize) -> u32 {
        gray_code(self.quantizer.quantize(self.filter.apply(image, frame)))
    }
}

/// Map quantizer level to a 2-bit Gray code (neighbouring levels differ by one bit).
pub fn gray_code(level: u8) -> u32 {
    const GRAY: [u32; 4] = [0, 1, 3, 2];
    GRAY[(level & 3) as usize]
}

use FilterKind::*;

/// The 16-classifier bank (Chromaprint "test2" training).
pub const CLASSIFIERS: [Classifier; 16] = [
    Classifier::new(Filter::new(Area, 4, 3, 15), Quantizer::new(1.98215, 2.35817, 2.63523)),
    Classifier::new(Filter::new(BandThirds, 4, 6, 15), Quantizer::new(-1.03809, -0.651211, -0.282167)),
    Classifier::new(Filter::new(BandHalves, 0, 4, 16), Quantizer::new(-0.298702, 0.119262, 0.558497)),
    Classifier::new(Filter::new(Quadrants, 8, 2, 12), Quantizer::new(-0.105439, 0.0153946, 0.135898)),
    Classifier::new(Filter::new(Quadrants, 4, 4, 8), Quantizer::new(-0.142891, 0.0258736, 0.200632)),
    Classifier::new(Filter::new(BandThirds, 0, 3, 5), Quantizer::new(-0.826319, -0.590612, -0.368214)),
    Classifier::new(Filter::new(BandHalves, 2, 2, 9), Quantizer::new(-0.557409, -0.233035, 0.0534525)),
    Classifier::new(Filter::new(TimeHalves, 7, 3, 4), Quantizer::new(-0.0646826, 0.00620476, 0.0784847)),
    Classifier::new(Filter::new(TimeHalves, 6, 2, 16), Quantizer::new(-0.192387, -0.029699, 0.215855)),
    Classifier::new(Filter::new(TimeHalves, 1, 3, 2), Quantizer::new(-0.0397818, -0.00568076, 0.0292026)),
    Classifier::new(Filter::new(TimeThirds, 10, 1, 15), Quantizer::new(-0.53823, -0.369934, -0.190235)),
    Classifier::new(Filter::new(Quadrants, 6, 2, 10), Quantizer::new(-0.124877, 0.0296483, 0.139239)),
    Classifier::new(Filter::new(TimeHalves, 1, 1, 14), Quantizer::new(-0.101475, 0.0225617, 0.231971)),
    Classifier::new(Filter::new(Quadrants, 5, 6, 4), Quantizer::new(-0.0799915, -0.00729616, 0.063262)),
    Classifier::new(Filter::new(BandHalves, 9, 2, 12), Quantizer::new(-0.272556, 0.019424, 0.302559)),
    Classifier::new(Filter::new(Quadrants, 4, 2, 14), Quantizer::new(-0.164292, -0.0321188, 0.0846339)),
];

/// Widest filter in `classifiers`, in frames.
pub fn max_width(classifiers: &[Classifier]) -> usize {
    classifiers.iter().map(|c| c.filter.width).max().unwrap_or(0)
}
