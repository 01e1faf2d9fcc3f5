use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::shared::NUM_AXES;
use crate::eval::{self, Histogram, DEFAULT_HISTOGRAM_BINS};
use crate::normalization::{NormalizationMeta, NormalizationType};
use crate::pipeline::PipelineResult;

#[remain::sorted]
#[derive(thiserror::Error, Debug)]
pub enum Err {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// The record written next to the artifacts of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mesh: String,
    pub group: String,
    /// Path of the file the mesh was loaded from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub method: NormalizationType,
    pub n_vertices: usize,
    pub bins: u64,
    pub mse: f64,
    pub mae: f64,
    pub mse_per_axis: [f64; NUM_AXES],
    pub mae_per_axis: [f64; NUM_AXES],
    pub meta: NormalizationMeta,
    /// Histogram of the per-vertex L2 error.
    #[serde(default)]
    pub error_histogram: Histogram,
}

impl Summary {
    pub fn from_result(result: &PipelineResult, source: Option<&Path>) -> Self {
        Self {
            mesh: result.mesh_id.clone(),
            group: result.group.clone(),
            source: source.map(|p| p.display().to_string()),
            method: result.strategy,
            n_vertices: result.vertex_count,
            bins: result.bins,
            mse: result.error.mse,
            mae: result.error.mae,
            mse_per_axis: result.error.mse_per_axis,
            mae_per_axis: result.error.mae_per_axis,
            meta: result.meta,
            error_histogram: eval::histogram(&result.error_magnitudes, DEFAULT_HISTOGRAM_BINS),
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Err> {
        let mut file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut file, self)?;
        file.flush()?;
        Ok(())
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, Err> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Writes the summary as `key: value` lines.
    pub fn write_text<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "mesh: {}", self.source.as_deref().unwrap_or(&self.mesh))?;
        writeln!(writer, "group: {}", self.group)?;
        writeln!(writer, "method: {}", self.method)?;
        writeln!(writer, "n_vertices: {}", self.n_vertices)?;
        writeln!(writer, "bins: {}", self.bins)?;
        writeln!(writer, "MSE: {:.12e}", self.mse)?;
        writeln!(writer, "MAE: {:.12e}", self.mae)?;
        writeln!(writer, "MSE_per_axis: {:?}", self.mse_per_axis)?;
        writeln!(writer, "MAE_per_axis: {:?}", self.mae_per_axis)?;
        writeln!(writer, "meta: {}", self.meta)?;
        Ok(())
    }

    pub fn save_text<P: AsRef<Path>>(&self, path: P) -> Result<(), Err> {
        let mut file = BufWriter::new(File::create(path)?);
        self.write_text(&mut file)?;
        file.flush()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::MeshInput;
    use crate::pipeline;

    fn summary() -> Summary {
        let input = MeshInput::new("tri", vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [0.3, 0.7, 1.1]])
            .with_group("shapes");
        let result = pipeline::run(&input, NormalizationType::MinMax, 16).unwrap();
        Summary::from_result(&result, Some(Path::new("samples/shapes/tri.obj")))
    }

    #[test]
    fn fields_come_from_the_result() {
        let s = summary();
        assert_eq!(s.mesh, "tri");
        assert_eq!(s.group, "shapes");
        assert_eq!(s.method, NormalizationType::MinMax);
        assert_eq!(s.n_vertices, 3);
        assert_eq!(s.bins, 16);
        assert_eq!(s.error_histogram.total(), 3);
        assert_eq!(s.error_histogram.counts.len(), DEFAULT_HISTOGRAM_BINS);
        assert!(s.mse > 0.0);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let s = summary();
        s.write_json(&path).unwrap();
        assert_eq!(Summary::read_json(&path).unwrap(), s);

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["method"], "minmax");
        assert_eq!(json["meta"]["kind"], "minmax");
    }

    #[test]
    fn text_lines() {
        let mut out = Vec::new();
        summary().write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let keys = text.lines()
            .map(|l| l.split_once(':').unwrap().0)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![
            "mesh", "group", "method", "n_vertices", "bins",
            "MSE", "MAE", "MSE_per_axis", "MAE_per_axis", "meta",
        ]);
        assert!(text.starts_with("mesh: samples/shapes/tri.obj\n"));
        assert!(text.contains("bins: 16\n"));
    }
}
