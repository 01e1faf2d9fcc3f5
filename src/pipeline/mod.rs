use std::fmt;

use serde::Serialize;

use crate::core::mesh::{FaceList, MeshInput};
use crate::core::shared::{ConfigType, Vertex};
use crate::eval::{self, ErrorReport};
use crate::normalization::{MinMax, NormalizationImpl, NormalizationMeta, NormalizationType, UnitSphere};
use crate::quantization::{self, QuantizedBuffer, Quantizer, DEFAULT_BINS};

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Error analysis failed: {0}")]
    EvalError(#[from] eval::Err),
    #[error("Quantization failed: {0}")]
    QuantizationError(#[from] quantization::Err),
}

/// Coarse classification of a failed run, used when reporting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidConfiguration,
    ShapeMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidConfiguration => f.write_str("InvalidConfiguration"),
            ErrorKind::ShapeMismatch => f.write_str("ShapeMismatch"),
        }
    }
}

impl Err {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Err::EvalError(eval::Err::ShapeMismatch { .. }) => ErrorKind::ShapeMismatch,
            Err::QuantizationError(_) => ErrorKind::InvalidConfiguration,
        }
    }
}


#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bins: u64,
    pub strategies: Vec<NormalizationType>,
}

impl ConfigType for Config {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            strategies: NormalizationType::ALL.to_vec(),
        }
    }
}


/// Everything one (mesh, strategy) run produces.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineResult {
    pub mesh_id: String,
    pub group: String,
    pub strategy: NormalizationType,
    pub vertex_count: usize,
    pub bins: u64,
    pub meta: NormalizationMeta,
    pub quantized: QuantizedBuffer,
    pub error: ErrorReport,
    /// Euclidean length of the error of each vertex.
    pub error_magnitudes: Vec<f64>,
    pub reconstructed: Vec<Vertex>,
    /// The input's face list, untouched.
    pub faces: Option<FaceList>,
}


/// Runs normalize, encode, decode, denormalize and error analysis, in that order, for one
/// mesh under one strategy. The input is only read.
pub fn run(input: &MeshInput, strategy: NormalizationType, bins: u64) -> Result<PipelineResult, Err> {
    let quantizer = Quantizer::new(bins)?;
    match strategy {
        NormalizationType::MinMax => run_with(input, MinMax, &quantizer),
        NormalizationType::UnitSphere => run_with(input, UnitSphere, &quantizer),
    }
}

/// Runs every configured strategy on the same input. One result per strategy, in the
/// configured order; a failing strategy does not prevent the others from running.
pub fn run_all(input: &MeshInput, cfg: &Config) -> Vec<(NormalizationType, Result<PipelineResult, Err>)> {
    cfg.strategies.iter()
        .map(|&strategy| (strategy, run(input, strategy, cfg.bins)))
        .collect()
}

fn run_with<N>(input: &MeshInput, normalization: N, quantizer: &Quantizer) -> Result<PipelineResult, Err>
    where N: NormalizationImpl,
{
    let _span = tracing::debug_span!(
        "pipeline",
        mesh = input.get_id(),
        strategy = N::TYPE.name(),
        bins = quantizer.get_bins()
    ).entered();

    let original = input.get_vertices();

    let (normalized, meta) = normalization.forward(original);
    let quantized = quantizer.encode(&normalized);
    let dequantized = quantizer.decode(&quantized)?;
    let reconstructed = normalization.inverse(&dequantized, &meta);

    let (error, error_magnitudes) = if original.is_empty() {
        tracing::debug!("empty vertex buffer, skipping error analysis");
        (ErrorReport::default(), Vec::new())
    } else {
        (
            eval::compute(original, &reconstructed)?,
            eval::error_magnitudes(original, &reconstructed)?,
        )
    };
    tracing::debug!(mse = error.mse, mae = error.mae, "reconstruction done");

    Ok(PipelineResult {
        mesh_id: input.get_id().to_owned(),
        group: input.get_group().to_owned(),
        strategy: N::TYPE,
        vertex_count: original.len(),
        bins: quantizer.get_bins(),
        meta: meta.into(),
        quantized,
        error,
        error_magnitudes,
        reconstructed,
        faces: input.get_faces().cloned(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> Vec<Vertex> {
        let mut out = Vec::new();
        for x in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for z in [0.0, 1.0] {
                    out.push([x, y, z]);
                }
            }
        }
        out
    }

    #[test]
    fn unit_cube_two_bins_is_lossless() {
        let input = MeshInput::new("cube", cube());
        let result = run(&input, NormalizationType::MinMax, 2).unwrap();
        for (q, v) in result.quantized.get_values().iter().zip(cube()) {
            assert_eq!(*q, v.map(|c| c as i64));
        }
        assert_eq!(result.reconstructed, cube());
        assert_eq!(result.error, ErrorReport::default());
        assert_eq!(result.vertex_count, 8);
        assert_eq!(result.bins, 2);
    }

    #[test]
    fn one_bin_is_invalid_configuration() {
        let input = MeshInput::new("cube", cube());
        for strategy in NormalizationType::ALL {
            let err = run(&input, strategy, 1).unwrap_err();
            assert_eq!(err, Err::QuantizationError(quantization::Err::TooFewBins(1)));
            assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        }
    }

    #[test]
    fn empty_input_gives_zero_report() {
        let input = MeshInput::new("nothing", Vec::new());
        for strategy in NormalizationType::ALL {
            let result = run(&input, strategy, 1024).unwrap();
            assert_eq!(result.error, ErrorReport::default());
            assert!(result.reconstructed.is_empty());
            assert!(result.quantized.is_empty());
            assert_eq!(result.vertex_count, 0);
        }
    }

    #[test]
    fn faces_are_passed_through() {
        let faces: FaceList = vec![[0, 1, 2], [2, 1, 3]].into();
        let input = MeshInput::new("quad", vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]])
            .with_group("flat")
            .with_faces(faces.clone());
        let result = run(&input, NormalizationType::UnitSphere, 64).unwrap();
        assert_eq!(result.faces, Some(faces));
        assert_eq!(result.group, "flat");
        assert_eq!(result.meta.get_type(), NormalizationType::UnitSphere);
    }

    #[test]
    fn run_all_follows_config() {
        let input = MeshInput::new("cube", cube());
        let cfg = Config::default();
        assert_eq!(cfg.bins, 1024);
        let results = run_all(&input, &cfg);
        let strategies = results.iter().map(|(s, _)| *s).collect::<Vec<_>>();
        assert_eq!(strategies, vec![NormalizationType::MinMax, NormalizationType::UnitSphere]);
        assert!(results.iter().all(|(_, r)| r.is_ok()));

        let cfg = Config { bins: 0, strategies: vec![NormalizationType::UnitSphere] };
        let results = run_all(&input, &cfg);
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_err());
    }

    #[test]
    fn error_is_within_one_step() {
        let vertices = vec![[0.3, -1.7, 2.2], [5.0, 0.1, -3.3], [1.1, 1.1, 1.1]];
        let input = MeshInput::new("tri", vertices.clone());
        let bins = 256;
        let result = run(&input, NormalizationType::MinMax, bins).unwrap();
        let meta = match result.meta {
            NormalizationMeta::MinMax(m) => m,
            _ => unreachable!(),
        };
        for (o, r) in vertices.iter().zip(result.reconstructed.iter()) {
            for i in 0..3 {
                let step = (meta.vmax[i] - meta.vmin[i]) / (bins - 1) as f64;
                // floor quantization never reconstructs above the input
                assert!(r[i] <= o[i] + 1e-12);
                assert!(o[i] - r[i] <= step + 1e-12);
            }
        }
    }
}
