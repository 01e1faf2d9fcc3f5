use serde::{Deserialize, Serialize};

use crate::core::shared::{Vertex, NUM_AXES};

/// Bin count used when none is configured.
pub const DEFAULT_BINS: u64 = 1024;

/// Largest supported bin count. Beyond 2^53 levels, `bins - 1` is no longer exact as an f64.
pub const MAX_BINS: u64 = 1 << 53;

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Quantized buffer was produced with {found} bins, but {expected} bins were requested")]
    BinsMismatch {
        expected: u64,
        found: u64,
    },
    #[error("Invalid bin count {0}: at least 2 bins are required")]
    TooFewBins(u64),
    #[error("Invalid bin count {0}: at most {max} bins are supported", max = MAX_BINS)]
    TooManyBins(u64),
    #[error("Quantized value {value} at vertex {index} is outside [0, {max}]")]
    ValueOutOfRange {
        index: usize,
        value: i64,
        max: i64,
    },
}

/// Returns an error unless `bins` is a usable bin count.
pub fn check_bins(bins: u64) -> Result<(), Err> {
    if bins < 2 {
        return Err(Err::TooFewBins(bins));
    }
    if bins > MAX_BINS {
        return Err(Err::TooManyBins(bins));
    }
    Ok(())
}


/// Vertices quantized to integer levels in `[0, bins - 1]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedBuffer {
    values: Vec<[i64; NUM_AXES]>,
    bins: u64,
}

impl QuantizedBuffer {
    /// Wraps values that were produced elsewhere, e.g. read back from a payload.
    /// Every component must lie in `[0, bins - 1]`.
    pub fn from_raw(values: Vec<[i64; NUM_AXES]>, bins: u64) -> Result<Self, Err> {
        check_bins(bins)?;
        let max = (bins - 1) as i64;
        for (index, v) in values.iter().enumerate() {
            if let Some(&value) = v.iter().find(|&&c| c < 0 || c > max) {
                return Err(Err::ValueOutOfRange { index, value, max });
            }
        }
        Ok(Self { values, bins })
    }

    pub fn get_values(&self) -> &[[i64; NUM_AXES]] {
        &self.values
    }

    pub fn get_bins(&self) -> u64 {
        self.bins
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<[i64; NUM_AXES]> {
        self.values
    }
}


/// A one-sided (floor) uniform quantizer over `[0, 1]`.
///
/// Encoding truncates towards zero, so every decoded value is at or below its input and
/// the error is bounded by one step, `1 / (bins - 1)`. The decoder does not add a
/// half-step offset back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantizer {
    bins: u64,
    max_level: i64,
    scale: f64,
}

impl Quantizer {
    pub fn new(bins: u64) -> Result<Self, Err> {
        check_bins(bins)?;
        let max_level = (bins - 1) as i64;
        Ok(Self {
            bins,
            max_level,
            scale: max_level as f64,
        })
    }

    pub fn get_bins(&self) -> u64 {
        self.bins
    }

    /// Size of one quantization level in the normalized domain.
    pub fn step(&self) -> f64 {
        1.0 / self.scale
    }

    #[inline]
    fn encode_value(&self, value: f64) -> i64 {
        // `as` saturates and maps NaN to 0; the clamp absorbs overshoot past 1.0.
        ((value * self.scale).floor() as i64).clamp(0, self.max_level)
    }

    pub fn encode(&self, normalized: &[Vertex]) -> QuantizedBuffer {
        let values = normalized.iter()
            .map(|v| v.map(|c| self.encode_value(c)))
            .collect();
        QuantizedBuffer { values, bins: self.bins }
    }

    pub fn decode(&self, quantized: &QuantizedBuffer) -> Result<Vec<Vertex>, Err> {
        if quantized.bins != self.bins {
            return Err(Err::BinsMismatch { expected: self.bins, found: quantized.bins });
        }
        Ok(quantized.values.iter()
            .map(|q| q.map(|c| c as f64 / self.scale))
            .collect())
    }
}

/// Quantizes `normalized` into `bins` levels.
pub fn encode(normalized: &[Vertex], bins: u64) -> Result<QuantizedBuffer, Err> {
    Ok(Quantizer::new(bins)?.encode(normalized))
}

/// Maps quantized levels back into `[0, 1]`.
pub fn decode(quantized: &QuantizedBuffer, bins: u64) -> Result<Vec<Vertex>, Err> {
    Quantizer::new(bins)?.decode(quantized)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_bin_counts() {
        assert_eq!(Quantizer::new(0), Err(Err::TooFewBins(0)));
        assert_eq!(Quantizer::new(1), Err(Err::TooFewBins(1)));
        assert_eq!(encode(&[[0.5; 3]], 1), Err(Err::TooFewBins(1)));
        assert_eq!(Quantizer::new(MAX_BINS + 1), Err(Err::TooManyBins(MAX_BINS + 1)));
        assert!(Quantizer::new(2).is_ok());
        assert!(Quantizer::new(MAX_BINS).is_ok());
    }

    #[test]
    fn floor_not_round() {
        let q = Quantizer::new(11).unwrap();
        let buf = q.encode(&[[0.0, 0.19, 0.99]]);
        assert_eq!(buf.get_values(), &[[0, 1, 9]]);
        let back = q.decode(&buf).unwrap();
        assert_eq!(back[0][0], 0.0);
        assert!((back[0][1] - 0.1).abs() < 1e-15);
        assert!((back[0][2] - 0.9).abs() < 1e-15);
    }

    #[test]
    fn boundary_maps_to_last_level() {
        let q = Quantizer::new(1024).unwrap();
        let buf = q.encode(&[[1.0, 1.0 + 1e-12, -1e-12]]);
        assert_eq!(buf.get_values(), &[[1023, 1023, 0]]);
        assert_eq!(q.decode(&buf).unwrap(), vec![[1.0, 1.0, 0.0]]);
    }

    #[test]
    fn nan_is_clamped_to_zero() {
        let q = Quantizer::new(16).unwrap();
        assert_eq!(q.encode(&[[f64::NAN, 0.0, 1.0]]).get_values(), &[[0, 0, 15]]);
    }

    #[test]
    fn decode_checks_bins() {
        let buf = encode(&[[0.5; 3]], 8).unwrap();
        assert_eq!(decode(&buf, 16), Err(Err::BinsMismatch { expected: 16, found: 8 }));
        assert_eq!(decode(&buf, 1), Err(Err::TooFewBins(1)));
        assert_eq!(decode(&buf, 8).unwrap(), vec![[3.0 / 7.0; 3]]);
    }

    #[test]
    fn from_raw_validates_range() {
        assert!(QuantizedBuffer::from_raw(vec![[0, 3, 1]], 4).is_ok());
        assert_eq!(
            QuantizedBuffer::from_raw(vec![[0, 0, 0], [0, 4, 1]], 4),
            Err(Err::ValueOutOfRange { index: 1, value: 4, max: 3 })
        );
        assert_eq!(
            QuantizedBuffer::from_raw(vec![[-1, 0, 0]], 4),
            Err(Err::ValueOutOfRange { index: 0, value: -1, max: 3 })
        );
    }

    #[test]
    fn empty_buffer() {
        let buf = encode(&[], 2).unwrap();
        assert!(buf.is_empty());
        assert!(decode(&buf, 2).unwrap().is_empty());
    }
}
