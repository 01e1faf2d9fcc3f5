use std::array;

use serde::{Deserialize, Serialize};

use crate::core::shared::{self, Vertex};
use super::{NormalizationImpl, NormalizationType};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSphereMeta {
    pub centroid: Vertex,
    /// Largest distance from the centroid, or 1.0 when every vertex sits on the centroid.
    pub max_radius: f64,
}

impl Default for UnitSphereMeta {
    fn default() -> Self {
        Self { centroid: [0.0; 3], max_radius: 1.0 }
    }
}

/// Centers the vertices on their centroid and scales them into the unit ball, then maps
/// `[-1, 1]` onto `[0, 1]` so the output shares the quantizer's input range.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitSphere;

impl NormalizationImpl for UnitSphere {
    const TYPE: NormalizationType = NormalizationType::UnitSphere;
    type Meta = UnitSphereMeta;

    fn forward(&self, vertices: &[Vertex]) -> (Vec<Vertex>, UnitSphereMeta) {
        let centroid = shared::axis_mean(vertices);
        let shifted = vertices.iter()
            .map(|&v| shared::sub(v, centroid))
            .collect::<Vec<_>>();
        let max_radius = shifted.iter()
            .map(|&v| shared::norm(v))
            .fold(0.0_f64, f64::max);
        let max_radius = if max_radius == 0.0 { 1.0 } else { max_radius };

        let out = shifted.into_iter()
            .map(|v| v.map(|c| (c / max_radius + 1.0) / 2.0))
            .collect();
        (out, UnitSphereMeta { centroid, max_radius })
    }

    fn inverse(&self, normalized: &[Vertex], meta: &UnitSphereMeta) -> Vec<Vertex> {
        normalized.iter()
            .map(|v| array::from_fn(|i| {
                let unit = v[i] * 2.0 - 1.0;
                unit * meta.max_radius + meta.centroid[i]
            }))
            .collect()
    }
}
