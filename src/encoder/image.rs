//! Summed-area table over a frames × bands matrix.

use crate::chroma::NUM_BANDS;

/// Integral image of a feature matrix.
///
/// Rows are frames (time), columns are pitch classes. Any rectangle sum is
/// four lookups.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    rows: usize,
    /// `(rows + 1) × (NUM_BANDS + 1)` prefix sums with a zero border
    sums: Vec<f64>,
}

const STRIDE: usize = NUM_BANDS + 1;

impl IntegralImage {
    /// Build the table from rows of pitch-class values.
    pub fn new(rows: &[[f32; NUM_BANDS]]) -> Self {
        let mut sums = vec![0.0f64; (rows.len() + 1) * STRIDE];

        for (r, row) in rows.iter().enumerate() {
            let mut running = 0.0f64;
            for (c, &value) in row.iter().enumerate() {
                running += value as f64;
                sums[(r + 1) * STRIDE + c + 1] = sums[r * STRIDE + c + 1] + running;
            }
        }

        Self {
            rows: rows.len(),
            sums,
        }
    }

    /// Number of rows (frames).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Sum over rows `r1..r2` and columns `c1..c2` (half-open).
    pub fn area(&self, r1: usize, c1: usize, r2: usize, c2: usize) -> f64 {
        debug_assert!(r1 <= r2 && r2 <= self.rows);
        debug_assert!(c1 <= c2 && c2 <= NUM_BANDS);
        let at = |r: usize, c: usize| self.sums[r * STRIDE + c];
        at(r2, c2) - at(r1, c2) - at(r2, c1) + at(r1, c1)
    }
}
