//! Reconstruction error metrics.
//!
//! The overall `mse`/`mae` are the mean of the three per-axis values.

use serde::{Deserialize, Serialize};

use crate::core::shared::{self, Vertex, NUM_AXES};

/// Number of histogram bins used for the per-vertex error magnitude.
pub const DEFAULT_HISTOGRAM_BINS: usize = 100;

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Shape mismatch: original has {original} vertices but reconstruction has {reconstructed}")]
    ShapeMismatch {
        original: usize,
        reconstructed: usize,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub mse: f64,
    pub mae: f64,
    pub mse_per_axis: [f64; NUM_AXES],
    pub mae_per_axis: [f64; NUM_AXES],
}

fn check_shape(original: &[Vertex], reconstructed: &[Vertex]) -> Result<(), Err> {
    if original.len() != reconstructed.len() {
        return Err(Err::ShapeMismatch {
            original: original.len(),
            reconstructed: reconstructed.len(),
        });
    }
    Ok(())
}

/// Computes per-axis and overall MSE and MAE of `original - reconstructed`.
/// Two empty buffers give an all-zero report.
pub fn compute(original: &[Vertex], reconstructed: &[Vertex]) -> Result<ErrorReport, Err> {
    check_shape(original, reconstructed)?;
    if original.is_empty() {
        return Ok(ErrorReport::default());
    }

    let mut sq = [0.0; NUM_AXES];
    let mut abs = [0.0; NUM_AXES];
    for (&o, &r) in original.iter().zip(reconstructed) {
        let diff = shared::sub(o, r);
        for i in 0..NUM_AXES {
            sq[i] += diff[i] * diff[i];
            abs[i] += diff[i].abs();
        }
    }

    let n = original.len() as f64;
    let mse_per_axis = sq.map(|s| s / n);
    let mae_per_axis = abs.map(|s| s / n);
    Ok(ErrorReport {
        mse: mse_per_axis.iter().sum::<f64>() / NUM_AXES as f64,
        mae: mae_per_axis.iter().sum::<f64>() / NUM_AXES as f64,
        mse_per_axis,
        mae_per_axis,
    })
}

/// Euclidean length of the error of each vertex.
pub fn error_magnitudes(original: &[Vertex], reconstructed: &[Vertex]) -> Result<Vec<f64>, Err> {
    check_shape(original, reconstructed)?;
    Ok(original.iter()
        .zip(reconstructed)
        .map(|(&o, &r)| shared::norm(shared::sub(o, r)))
        .collect())
}


/// Equal-width histogram over `[min, max]`; the last bin is closed on the right.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        if self.counts.is_empty() {
            return 0.0;
        }
        (self.max - self.min) / self.counts.len() as f64
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Bins the finite entries of `values`. An empty input uses the range `[0, 1]`, and a
/// constant input is widened by 0.5 on each side.
pub fn histogram(values: &[f64], num_bins: usize) -> Histogram {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (mut min, mut max) = finite.clone()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        min = 0.0;
        max = 1.0;
    } else if min == max {
        min -= 0.5;
        max += 0.5;
    }

    let mut counts = vec![0_u64; num_bins];
    if num_bins == 0 {
        return Histogram { min, max, counts };
    }
    let width = (max - min) / num_bins as f64;
    for v in finite {
        let idx = (((v - min) / width) as usize).min(num_bins - 1);
        counts[idx] += 1;
    }
    Histogram { min, max, counts }
}
