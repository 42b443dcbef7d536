//! Compact binary/base64 form of a fingerprint.
//!
//! Layout (compatible with Chromaprint's compressed fingerprints):
//!
//! ```text
//! [algorithm: u8][code count: u24 BE][3-bit gaps ...][5-bit exceptions ...]
//! ```
//!
//! Codes are XOR delta-coded against their predecessor. Each delta is
//! written as the distances between its set bits (1-based, LSB first) and a
//! terminating 0. Distances of 7 or more store 7 in the 3-bit stream and the
//! remainder in the 5-bit stream. Both streams are packed LSB first.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::{FingerprintError, Result};

const NORMAL_BITS: u32 = 3;
const EXCEPTION_BITS: u32 = 5;
const MAX_NORMAL_VALUE: u8 = (1 << NORMAL_BITS) - 1;
const HEADER_LEN: usize = 4;
const MAX_CODES: usize = 0xFF_FFFF;

/// XOR each code with its predecessor.
pub fn delta_encode(codes: &[u32]) -> Vec<u32> {
    codes
        .iter()
        .scan(0u32, |last, &code| {
            let delta = code ^ *last;
            *last = code;
            Some(delta)
        })
        .collect()
}

/// Undo [`delta_encode`].
pub fn delta_decode(deltas: &[u32]) -> Vec<u32> {
    deltas
        .iter()
        .scan(0u32, |last, &delta| {
            *last ^= delta;
            Some(*last)
        })
        .collect()
}

/// Compress `codes` into the binary layout.
pub fn compress(codes: &[u32], algorithm: u8) -> Result<Vec<u8>> {
    if codes.len() > MAX_CODES {
        return Err(FingerprintError::InvalidFingerprint(format!(
            "{} codes exceed the compact format limit",
            codes.len()
        )));
    }

    let mut normal = Vec::with_capacity(codes.len() * 4);
    let mut exceptional = Vec::new();

    for delta in delta_encode(codes) {
        let mut x = delta;
        let mut bit = 1u8;
        let mut last_bit = 0u8;
        while x != 0 {
            if x & 1 != 0 {
                let gap = bit - last_bit;
                if gap >= MAX_NORMAL_VALUE {
                    normal.push(MAX_NORMAL_VALUE);
                    exceptional.push(gap - MAX_NORMAL_VALUE);
                } else {
                    normal.push(gap);
                }
                last_bit = bit;
            }
            x >>= 1;
            bit += 1;
        }
        normal.push(0);
    }

    let size = codes.len();
    let mut out = vec![
        algorithm,
        ((size >> 16) & 0xFF) as u8,
        ((size >> 8) & 0xFF) as u8,
        (size & 0xFF) as u8,
    ];
    out.extend(pack(&normal, NORMAL_BITS));
    out.extend(pack(&exceptional, EXCEPTION_BITS));
    Ok(out)
}

/// Decompress the binary layout into `(algorithm, codes)`.
pub fn decompress(bytes: &[u8]) -> Result<(u8, Vec<u32>)> {
    let invalid = |msg: &str| FingerprintError::InvalidFingerprint(msg.to_string());

    if bytes.len() < HEADER_LEN {
        return Err(invalid("shorter than the header"));
    }
    let algorithm = bytes[0];
    let size = (bytes[1] as usize) << 16 | (bytes[2] as usize) << 8 | bytes[3] as usize;
    if size == 0 {
        return Ok((algorithm, Vec::new()));
    }

    let body = &bytes[HEADER_LEN..];
    let normal = unpack(body, NORMAL_BITS);

    // Find how many gap values encode `size` codes
    let mut terminators = 0;
    let mut used = 0;
    for (i, &value) in normal.iter().enumerate() {
        if value == 0 {
            terminators += 1;
            if terminators == size {
                used = i + 1;
                break;
            }
        }
    }
    if terminators < size {
        return Err(invalid("gap stream ended early"));
    }

    let exception_start = (used * NORMAL_BITS as usize).div_ceil(8);
    let exceptional = unpack(&body[exception_start.min(body.len())..], EXCEPTION_BITS);
    let mut exceptions = exceptional.into_iter();

    let mut deltas = Vec::with_capacity(size);
    let mut x = 0u32;
    let mut last_bit = 0u32;
    for &value in &normal[..used] {
        if value == 0 {
            deltas.push(x);
            x = 0;
            last_bit = 0;
            continue;
        }

        let mut gap = value as u32;
        if value == MAX_NORMAL_VALUE {
            gap += exceptions
                .next()
                .ok_or_else(|| invalid("exception stream ended early"))? as u32;
        }
        let bit = last_bit + gap;
        if bit > u32::BITS {
            return Err(invalid("bit position out of range"));
        }
        x |= 1 << (bit - 1);
        last_bit = bit;
    }

    Ok((algorithm, delta_decode(&deltas)))
}

/// Compress and base64-encode (URL-safe, no padding).
pub fn encode_string(codes: &[u32], algorithm: u8) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(compress(codes, algorithm)?))
}

/// Base64-decode and decompress.
pub fn decode_string(s: &str) -> Result<(u8, Vec<u32>)> {
    let bytes = URL_SAFE_NO_PAD
        .decode(s.trim())
        .map_err(|e| FingerprintError::InvalidFingerprint(format!("bad base64: {e}")))?;
    decompress(&bytes)
}

/// Pack `values` as `bits`-wide integers, LSB first.
fn pack(values: &[u8], bits: u32) -> Vec<u8> {
    let mask = (1u32 << bits) - 1;
    let mut out = Vec::with_capacity((values.len() * bits as usize).div_ceil(8));
    let mut acc = 0u32;
    let mut filled = 0u32;

    for &v in values {
        acc |= (v as u32 & mask) << filled;
        filled += bits;
        while filled >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            filled -= 8;
        }
    }
    if filled > 0 {
        out.push(acc as u8);
    }
    out
}

/// Unpack every whole `bits`-wide integer in `bytes`.
fn unpack(bytes: &[u8], bits: u32) -> Vec<u8> {
    let mask = (1u32 << bits) - 1;
    let mut out = Vec::with_capacity(bytes.len() * 8 / bits as usize);
    let mut acc = 0u32;
    let mut filled = 0u32;

    for &byte in bytes {
        acc |= (byte as u32) << filled;
        filled += 8;
        while filled >= bits {
            out.push((acc & mask) as u8);
            acc >>= bits;
            filled -= bits;
        }
    }
    out
}
