use std::array;

use serde::{Deserialize, Serialize};

use crate::core::shared::{self, Vertex, NUM_AXES};
use super::{NormalizationImpl, NormalizationType};

/// Raw per-axis bounds of the input. `vmax - vmin` may be zero on a flat axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxMeta {
    pub vmin: Vertex,
    pub vmax: Vertex,
}

impl MinMaxMeta {
    /// The divisor used by the forward pass. A zero range is replaced by 1.0, which maps
    /// every vertex to 0 on that axis.
    pub fn denominators(&self) -> Vertex {
        array::from_fn(|i| {
            let range = self.vmax[i] - self.vmin[i];
            if range == 0.0 { 1.0 } else { range }
        })
    }
}

/// Maps each axis independently onto `[0, 1]` using its own bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinMax;

impl NormalizationImpl for MinMax {
    const TYPE: NormalizationType = NormalizationType::MinMax;
    type Meta = MinMaxMeta;

    fn forward(&self, vertices: &[Vertex]) -> (Vec<Vertex>, MinMaxMeta) {
        let (vmin, vmax) = shared::axis_bounds(vertices);
        let meta = MinMaxMeta { vmin, vmax };
        let denom = meta.denominators();
        let out = vertices.iter()
            .map(|v| array::from_fn(|i| (v[i] - vmin[i]) / denom[i]))
            .collect();
        (out, meta)
    }

    fn inverse(&self, normalized: &[Vertex], meta: &MinMaxMeta) -> Vec<Vertex> {
        // The raw range is used here, not the substituted denominator: on a flat axis the
        // normalized value is 0 and the result is vmin, the original value.
        let range: [f64; NUM_AXES] = array::from_fn(|i| meta.vmax[i] - meta.vmin[i]);
        normalized.iter()
            .map(|v| array::from_fn(|i| v[i] * range[i] + meta.vmin[i]))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_bounds_to_unit_interval() {
        let vertices = vec![
            [-1.0, 10.0, 0.0],
            [1.0, 20.0, 4.0],
            [0.0, 15.0, 1.0],
        ];
        let (normalized, meta) = MinMax.forward(&vertices);
        assert_eq!(meta.vmin, [-1.0, 10.0, 0.0]);
        assert_eq!(meta.vmax, [1.0, 20.0, 4.0]);
        assert_eq!(normalized, vec![
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            [0.5, 0.5, 0.25],
        ]);
    }

    #[test]
    fn flat_axis_normalizes_to_zero() {
        let vertices = vec![
            [0.0, 3.0, 1.0],
            [2.0, 3.0, 5.0],
            [1.0, 3.0, 2.0],
        ];
        let (normalized, meta) = MinMax.forward(&vertices);
        assert_eq!(meta.denominators(), [2.0, 1.0, 4.0]);
        for v in &normalized {
            assert_eq!(v[1], 0.0);
            assert!(v.iter().all(|c| c.is_finite()));
        }
        let back = MinMax.inverse(&normalized, &meta);
        for (a, b) in vertices.iter().zip(back.iter()) {
            assert_eq!(a[1], b[1]);
        }
    }

    #[test]
    fn single_vertex() {
        let vertices = vec![[7.0, -2.0, 0.5]];
        let (normalized, meta) = MinMax.forward(&vertices);
        assert_eq!(normalized, vec![[0.0; 3]]);
        assert_eq!(MinMax.inverse(&normalized, &meta), vertices);
    }

    #[test]
    fn empty_input() {
        let (normalized, meta) = MinMax.forward(&[]);
        assert!(normalized.is_empty());
        assert_eq!(meta, MinMaxMeta::default());
        assert!(MinMax.inverse(&normalized, &meta).is_empty());
    }
}
