//! Scalar quantization: stateless min-max compression of f32 vectors.
//!
//! Each vector is compressed independently by finding its min and max,
//! then linearly mapping every component into \[0, 255\] (8-bit) or
//! \[0, 15\] (4-bit, two codes packed per byte). The `min`/`max` pair is
//! stored per vector for dequantization. There is no training step and
//! no shared state; every call is self-contained.

use serde::{Deserialize, Serialize};

use crate::error::{QuantError, Result};

/// Bit width of a scalar-quantized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarBits {
    /// One byte per element. 4x compression over f32.
    #[serde(rename = "8bit")]
    Eight,
    /// One nibble per element, two elements per byte. 8x compression.
    #[serde(rename = "4bit")]
    Four,
}

impl ScalarBits {
    /// Compression ratio relative to f32 storage. A closed-form property
    /// of the bit width, not measured from actual byte counts.
    pub fn compression_ratio(&self) -> f32 {
        match self {
            ScalarBits::Eight => 4.0,
            ScalarBits::Four => 8.0,
        }
    }

    /// Number of quantization levels minus one (the top code).
    fn max_code(&self) -> f32 {
        match self {
            ScalarBits::Eight => 255.0,
            ScalarBits::Four => 15.0,
        }
    }
}

/// A scalar-quantized vector with the range needed for reconstruction.
///
/// For 4-bit records `data` holds ⌈dim/2⌉ bytes with the earlier element
/// in the high nibble; an odd trailing nibble is zero-padded and ignored
/// on decode. `dim` is always carried so unpacking is unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarQuantized {
    pub data: Vec<u8>,
    pub min: f32,
    pub max: f32,
    pub dim: usize,
    pub bits: ScalarBits,
}

impl ScalarQuantized {
    /// Dequantize back to f32, dispatching on the stored bit width. Lossy.
    pub fn dequantize(&self) -> Result<Vec<f32>> {
        match self.bits {
            ScalarBits::Eight => dequantize_8bit(self),
            ScalarBits::Four => dequantize_4bit(self),
        }
    }
}

/// Observational reconstruction-error statistics.
///
/// Used by tests and diagnostics; never gates correctness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationStats {
    pub mean_abs_error: f32,
    pub max_abs_error: f32,
    pub mean_squared_error: f32,
}

fn quantize_codes(vector: &[f32], bits: ScalarBits) -> Result<(Vec<u8>, f32, f32)> {
    if vector.is_empty() {
        return Err(QuantError::Validation(
            "cannot quantize an empty vector".to_string(),
        ));
    }

    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in vector {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }

    let range = max - min;
    let codes = if range <= 0.0 {
        // Constant vector: every element maps to code 0, which decodes
        // back to `min` exactly.
        vec![0u8; vector.len()]
    } else {
        let scale = bits.max_code() / range;
        vector
            .iter()
            .map(|&v| ((v - min) * scale).round().clamp(0.0, bits.max_code()) as u8)
            .collect()
    };

    Ok((codes, min, max))
}

/// Quantize a vector to one byte per element using min-max scaling.
///
/// Maps each element to `round((x - min) / (max - min) * 255)`; a
/// constant vector (max == min) maps every element to 0. Fails only on
/// empty input.
pub fn quantize_8bit(vector: &[f32]) -> Result<ScalarQuantized> {
    let (data, min, max) = quantize_codes(vector, ScalarBits::Eight)?;
    Ok(ScalarQuantized {
        data,
        min,
        max,
        dim: vector.len(),
        bits: ScalarBits::Eight,
    })
}

/// Quantize a vector to one nibble per element, two elements per byte.
///
/// The earlier element occupies the high nibble. For odd-length vectors
/// the final low nibble is zero-padded and carries no data.
pub fn quantize_4bit(vector: &[f32]) -> Result<ScalarQuantized> {
    let (codes, min, max) = quantize_codes(vector, ScalarBits::Four)?;

    let mut data = Vec::with_capacity(codes.len().div_ceil(2));
    for pair in codes.chunks(2) {
        let high = pair[0] << 4;
        let low = if pair.len() == 2 { pair[1] & 0x0F } else { 0 };
        data.push(high | low);
    }

    Ok(ScalarQuantized {
        data,
        min,
        max,
        dim: vector.len(),
        bits: ScalarBits::Four,
    })
}

fn check_bits(record: &ScalarQuantized, expected: ScalarBits) -> Result<()> {
    if record.bits != expected {
        return Err(QuantError::Validation(format!(
            "record bit width {:?} does not match requested decode path {:?}",
            record.bits, expected
        )));
    }
    Ok(())
}

/// Inverse of [`quantize_8bit`]. Each reconstructed element lies within
/// one quantization step `(max - min) / 255` of the original.
pub fn dequantize_8bit(record: &ScalarQuantized) -> Result<Vec<f32>> {
    check_bits(record, ScalarBits::Eight)?;
    if record.data.len() != record.dim {
        return Err(QuantError::Validation(format!(
            "8-bit record has {} bytes for dimension {}",
            record.data.len(),
            record.dim
        )));
    }

    let step = (record.max - record.min) / 255.0;
    Ok(record
        .data
        .iter()
        .map(|&code| record.min + code as f32 * step)
        .collect())
}

/// Inverse of [`quantize_4bit`]. Uses the stored `dim` to unpack the
/// final odd element correctly.
pub fn dequantize_4bit(record: &ScalarQuantized) -> Result<Vec<f32>> {
    check_bits(record, ScalarBits::Four)?;
    if record.data.len() != record.dim.div_ceil(2) {
        return Err(QuantError::Validation(format!(
            "4-bit record has {} bytes for dimension {}",
            record.data.len(),
            record.dim
        )));
    }

    let step = (record.max - record.min) / 15.0;
    let mut out = Vec::with_capacity(record.dim);
    for i in 0..record.dim {
        let byte = record.data[i / 2];
        let code = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        out.push(record.min + code as f32 * step);
    }
    Ok(out)
}

/// Compute reconstruction-error statistics between an original vector
/// and its dequantized counterpart.
pub fn quantization_error(original: &[f32], reconstructed: &[f32]) -> Result<QuantizationStats> {
    if original.is_empty() {
        return Err(QuantError::Validation(
            "cannot compute error statistics for empty vectors".to_string(),
        ));
    }
    if original.len() != reconstructed.len() {
        return Err(QuantError::DimensionMismatch {
            expected: original.len(),
            actual: reconstructed.len(),
        });
    }

    let mut sum_abs = 0.0f64;
    let mut max_abs = 0.0f32;
    let mut sum_sq = 0.0f64;
    for (&a, &b) in original.iter().zip(reconstructed.iter()) {
        let diff = (a - b).abs();
        sum_abs += diff as f64;
        sum_sq += (diff as f64) * (diff as f64);
        if diff > max_abs {
            max_abs = diff;
        }
    }

    let n = original.len() as f64;
    Ok(QuantizationStats {
        mean_abs_error: (sum_abs / n) as f32,
        max_abs_error: max_abs,
        mean_squared_error: (sum_sq / n) as f32,
    })
}
