//! The fingerprint value returned to callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoder::compact;
use crate::error::{FingerprintError, Result};

/// Algorithm identifier written into the compact form.
pub const ALGORITHM_ID: u8 = 1;

/// An acoustic fingerprint: one 32-bit code per super-frame, in time order.
///
/// Serializes as a plain integer array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(Vec<u32>);

impl Fingerprint {
    pub fn new(codes: Vec<u32>) -> Self {
        Self(codes)
    }

    /// The raw codes.
    pub fn codes(&self) -> &[u32] {
        &self.0
    }

    pub fn into_codes(self) -> Vec<u32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// XOR delta-coded codes (first code unchanged).
    pub fn deltas(&self) -> Vec<u32> {
        compact::delta_encode(&self.0)
    }

    /// Rebuild a fingerprint from [`Self::deltas`] output.
    pub fn from_deltas(deltas: &[u32]) -> Self {
        Self(compact::delta_decode(deltas))
    }

    /// Compressed, URL-safe base64 form for crossing a host boundary.
    ///
    /// Fails only past 2^24 codes (over 500 hours of audio).
    pub fn to_compact_string(&self) -> Result<String> {
        compact::encode_string(&self.0, ALGORITHM_ID)
    }

    /// Parse the form produced by [`Self::to_compact_string`].
    pub fn from_compact_string(s: &str) -> Result<Self> {
        let (algorithm, codes) = compact::decode_string(s)?;
        if algorithm != ALGORITHM_ID {
            return Err(FingerprintError::InvalidFingerprint(format!(
                "unsupported algorithm {algorithm}"
            )));
        }
        Ok(Self(codes))
    }

    /// Best `1 - bit error rate` between the two fingerprints over
    /// alignments shifted by up to `max_offset` codes.
    ///
    /// Alignments overlapping less than half of the shorter fingerprint are
    /// ignored. Returns 0.0 when either side is empty.
    pub fn similarity(&self, other: &Fingerprint, max_offset: usize) -> f32 {
        let (a, b) = (&self.0, &other.0);
        let min_overlap = (a.len().min(b.len()) / 2).max(1);

        let mut best = 0.0f32;
        for shift in -(max_offset as isize)..=max_offset as isize {
            let (a_start, b_start) = if shift >= 0 {
                (shift as usize, 0)
            } else {
                (0, shift.unsigned_abs())
            };
            if a_start >= a.len() || b_start >= b.len() {
                continue;
            }

            let overlap = (a.len() - a_start).min(b.len() - b_start);
            if overlap < min_overlap {
                continue;
            }

            let errors: u32 = a[a_start..a_start + overlap]
                .iter()
                .zip(&b[b_start..b_start + overlap])
                .map(|(x, y)| (x ^ y).count_ones())
                .sum();
            let score = 1.0 - errors as f32 / (overlap as f32 * 32.0);
            best = best.max(score);
        }
        best
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_compact_string().map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_compact_string(s)
    }
}

impl From<Vec<u32>> for Fingerprint {
    fn from(codes: Vec<u32>) -> Self {
        Self(codes)
    }
}
