//! Parameter bit-encoding for genetic-algorithm tuning of detector
//! configuration (spec.md §4.7).
//!
//! Grounded in `original_source/src/imgProc/ltiFastHessianDetection.cpp`'s
//! `parameters` chromosome (de)serialization: each tunable field is packed
//! into a fixed-width bit string using one of three codings depending on
//! how the field's value space behaves.

/// How a single parameter field is packed into (and read back out of) a
/// fixed-width bit string (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneEncoding {
    /// The bit pattern, read as an unsigned integer, *is* the value.
    /// Used for small integer parameters such as `numberOfLevels`.
    DirectUnsigned { bits: u32 },
    /// Affine (linear) mapping of the unsigned bit pattern onto
    /// `[min, max]`. The original calls this `bitsToDouble`.
    Affine { bits: u32, min: f32, max: f32 },
    /// Logarithmic-reciprocal mapping: resolution concentrates near `min`
    /// rather than spreading evenly, appropriate for an angular-width
    /// field where small widths need finer discrimination than large
    /// ones. `min` and `max` must both be strictly positive.
    LogReciprocal { bits: u32, min: f32, max: f32 },
}

impl GeneEncoding {
    #[must_use]
    pub fn bit_width(&self) -> u32 {
        match *self {
            GeneEncoding::DirectUnsigned { bits }
            | GeneEncoding::Affine { bits, .. }
            | GeneEncoding::LogReciprocal { bits, .. } => bits,
        }
    }

    fn max_code(&self) -> u32 {
        let bits = self.bit_width();
        if bits >= 32 {
            u32::MAX
        } else {
            (1u32 << bits) - 1
        }
    }
}

/// Pack `value` into its bit code under `encoding` (spec.md §4.7 encode
/// direction). Out-of-range values are clamped to the field's range
/// before encoding rather than wrapping, since a chromosome mutation can
/// legitimately drift outside `[min, max]`.
#[must_use]
pub fn encode(value: f32, encoding: GeneEncoding) -> u32 {
    let max_code = encoding.max_code();
    match encoding {
        GeneEncoding::DirectUnsigned { .. } => value.round().clamp(0.0, max_code as f32) as u32,
        GeneEncoding::Affine { min, max, .. } => {
            let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
            (t * max_code as f32).round() as u32
        }
        GeneEncoding::LogReciprocal { min, max, .. } => {
            let (min, max) = (min.max(f32::MIN_POSITIVE), max.max(f32::MIN_POSITIVE));
            let v = value.clamp(min, max);
            let log_min = (1.0 / max).ln();
            let log_max = (1.0 / min).ln();
            let t = (((1.0 / v).ln() - log_min) / (log_max - log_min)).clamp(0.0, 1.0);
            (t * max_code as f32).round() as u32
        }
    }
}

/// Unpack a bit code back into a parameter value under `encoding`
/// (spec.md §4.7 decode direction). The inverse of `encode`, up to the
/// quantization error inherent in a fixed bit width.
#[must_use]
pub fn decode(code: u32, encoding: GeneEncoding) -> f32 {
    let max_code = encoding.max_code();
    let code = code.min(max_code);
    match encoding {
        GeneEncoding::DirectUnsigned { .. } => code as f32,
        GeneEncoding::Affine { min, max, .. } => {
            let t = code as f32 / max_code as f32;
            min + t * (max - min)
        }
        GeneEncoding::LogReciprocal { min, max, .. } => {
            let (min, max) = (min.max(f32::MIN_POSITIVE), max.max(f32::MIN_POSITIVE));
            let log_min = (1.0 / max).ln();
            let log_max = (1.0 / min).ln();
            let t = code as f32 / max_code as f32;
            let log_recip = log_min + t * (log_max - log_min);
            1.0 / log_recip.exp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_unsigned_round_trips_an_integer_count() {
        let enc = GeneEncoding::DirectUnsigned { bits: 5 };
        for n in [0.0, 7.0, 31.0] {
            let code = encode(n, enc);
            assert_eq!(decode(code, enc), n);
        }
    }

    #[test]
    fn direct_unsigned_clamps_to_the_bit_width() {
        let enc = GeneEncoding::DirectUnsigned { bits: 4 };
        assert_eq!(encode(100.0, enc), 15);
    }

    #[test]
    fn affine_round_trips_within_quantization_error() {
        let enc = GeneEncoding::Affine {
            bits: 12,
            min: -1.0,
            max: 1.0,
        };
        for v in [-1.0f32, -0.25, 0.0, 0.5, 1.0] {
            let code = encode(v, enc);
            let back = decode(code, enc);
            assert!((back - v).abs() < 1e-3, "{v} -> {code} -> {back}");
        }
    }

    #[test]
    fn affine_endpoints_hit_the_extreme_codes() {
        let enc = GeneEncoding::Affine {
            bits: 8,
            min: 0.0,
            max: 10.0,
        };
        assert_eq!(encode(0.0, enc), 0);
        assert_eq!(encode(10.0, enc), 255);
    }

    #[test]
    fn log_reciprocal_round_trips_an_angular_width() {
        let enc = GeneEncoding::LogReciprocal {
            bits: 10,
            min: 0.01,
            max: 3.14,
        };
        for v in [0.01f32, 0.1, 1.0, 3.14] {
            let code = encode(v, enc);
            let back = decode(code, enc);
            assert!((back - v).abs() / v < 0.01, "{v} -> {code} -> {back}");
        }
    }

    #[test]
    fn log_reciprocal_concentrates_resolution_near_the_minimum() {
        let enc = GeneEncoding::LogReciprocal {
            bits: 8,
            min: 0.01,
            max: 10.0,
        };
        let step_small = decode(encode(0.02, enc) + 1, enc) - decode(encode(0.02, enc), enc);
        let step_large = decode(encode(9.0, enc) + 1, enc) - decode(encode(9.0, enc), enc);
        assert!(step_small.abs() < step_large.abs());
    }
}
