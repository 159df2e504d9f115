use crate::error::{Error, Result};

/// A quantized vector: `u8` codes plus the per-vector scale that produced
/// them. `min == max` marks a constant vector (all codes are zero).
#[derive(Debug, Clone, PartialEq)]
pub struct Quantized {
    pub codes: Vec<u8>,
    pub min: f32,
    pub max: f32,
}

/// Zero-sized marker for the scalar quantization codec (spec.md 4.1).
/// Per-vector min/max scaling, not the unit-sphere mapping the teacher's
/// own `Quantizer` used — this one is required for the documented error
/// bound between `dequantize(quantize(v))` and `v`.
pub struct Quantizer;

impl Quantizer {
    pub fn quantize(v: &[f32]) -> Quantized {
        let mut mn = f32::INFINITY;
        let mut mx = f32::NEG_INFINITY;
        for &x in v {
            mn = mn.min(x);
            mx = mx.max(x);
        }

        if v.is_empty() {
            return Quantized { codes: Vec::new(), min: 0.0, max: 0.0 };
        }

        if mx == mn {
            return Quantized { codes: vec![0u8; v.len()], min: mn, max: mx };
        }

        let scale = 255.0 / (mx - mn);
        let codes = v
            .iter()
            .map(|&x| {
                let q = ((x - mn) * scale).round();
                q.clamp(0.0, 255.0) as u8
            })
            .collect();

        Quantized { codes, min: mn, max: mx }
    }

    pub fn dequantize(q: &Quantized) -> Vec<f32> {
        if q.max == q.min {
            return vec![q.min; q.codes.len()];
        }
        let step = (q.max - q.min) / 255.0;
        q.codes.iter().map(|&c| q.min + c as f32 * step).collect()
    }

    /// Approximate distance between two quantized vectors, averaging their
    /// per-vector scales (spec.md 4.1). Not exact; the query engine uses
    /// true Euclidean distance on dequantized vectors for refinement.
    pub fn approx_distance(a: &Quantized, b: &Quantized) -> Result<f32> {
        if a.codes.len() != b.codes.len() {
            return Err(Error::DimensionMismatch {
                expected: a.codes.len(),
                actual: b.codes.len(),
            });
        }

        let s1 = (a.max - a.min) / 255.0;
        let s2 = (b.max - b.min) / 255.0;
        let s = (s1 + s2) / 2.0;

        let sum: f32 = a
            .codes
            .iter()
            .zip(b.codes.iter())
            .map(|(&x, &y)| {
                let d = x as f32 - y as f32;
                d * d
            })
            .sum();

        Ok(sum.sqrt() * s)
    }
}
