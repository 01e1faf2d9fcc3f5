use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::discover::DiscoveredMesh;
use crate::io::summary::{self, Summary};
use crate::io::{payload, ply};
use crate::pipeline::PipelineResult;

pub const QUANTIZED_FILE_NAME: &str = "quantized.bin";
pub const VERTICES_FILE_NAME: &str = "reconstructed_vertices.bin";
pub const SUMMARY_JSON_NAME: &str = "summary.json";
pub const SUMMARY_TEXT_NAME: &str = "summary.txt";

/// Consumer of finished runs. Called from worker threads, possibly concurrently.
pub trait ResultSink: Sync {
    type Err: std::error::Error + Send + Sync + 'static;

    fn accept(&self, result: &PipelineResult) -> Result<(), Self::Err>;
}

/// Discards every result.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    type Err = std::convert::Infallible;

    fn accept(&self, _result: &PipelineResult) -> Result<(), Self::Err> {
        Ok(())
    }
}


#[remain::sorted]
#[derive(thiserror::Error, Debug)]
pub enum Err {
    #[error("IO error at '{path}': {source}")]
    IoError {
        path: String,
        source: io::Error,
    },
    #[error("Payload error: {0}")]
    PayloadError(#[from] payload::Err),
    #[error("Summary error: {0}")]
    SummaryError(#[from] summary::Err),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Target {
    out_dir: PathBuf,
    source: Option<PathBuf>,
}

/// Writes the artifacts of every run to disk, under `<mesh out dir>/<method>/`.
///
/// Meshes registered through [ArtifactSink::from_plan] use the output directory the plan
/// chose for them; any other mesh goes to `<out_dir>/<group>/<mesh id>`.
#[derive(Clone, Debug)]
pub struct ArtifactSink {
    out_dir: PathBuf,
    targets: HashMap<(String, String), Target>,
}

impl ArtifactSink {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            targets: HashMap::new(),
        }
    }

    pub fn from_plan<P: AsRef<Path>>(out_dir: P, plan: &[DiscoveredMesh]) -> Self {
        let mut sink = Self::new(out_dir);
        for mesh in plan {
            sink.targets.insert(
                (mesh.group.clone(), mesh.name.clone()),
                Target { out_dir: mesh.out_dir.clone(), source: Some(mesh.path.clone()) },
            );
        }
        sink
    }

    /// Directory the artifacts of `result` are written to.
    pub fn run_dir(&self, result: &PipelineResult) -> PathBuf {
        let key = (result.group.clone(), result.mesh_id.clone());
        let mesh_dir = match self.targets.get(&key) {
            Some(target) => target.out_dir.clone(),
            None => self.out_dir.join(&result.group).join(&result.mesh_id),
        };
        mesh_dir.join(result.strategy.name())
    }

    fn source(&self, result: &PipelineResult) -> Option<&Path> {
        self.targets.get(&(result.group.clone(), result.mesh_id.clone()))
            .and_then(|t| t.source.as_deref())
    }
}

impl ResultSink for ArtifactSink {
    type Err = Err;

    fn accept(&self, result: &PipelineResult) -> Result<(), Err> {
        let dir = self.run_dir(result);
        fs::create_dir_all(&dir)
            .map_err(|source| Err::IoError { path: dir.display().to_string(), source })?;

        payload::save_quantized(dir.join(QUANTIZED_FILE_NAME), result.strategy, &result.quantized)?;
        payload::save_vertices(dir.join(VERTICES_FILE_NAME), &result.reconstructed)?;

        let ply_path = dir.join(format!("{}_reconstructed.ply", result.mesh_id));
        ply::save_ply(&ply_path, &result.reconstructed, result.faces.as_deref())
            .map_err(|source| Err::IoError { path: ply_path.display().to_string(), source })?;

        let summary = Summary::from_result(result, self.source(result));
        summary.write_json(dir.join(SUMMARY_JSON_NAME))?;
        summary.save_text(dir.join(SUMMARY_TEXT_NAME))?;

        tracing::debug!(dir = %dir.display(), "artifacts written");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::MeshInput;
    use crate::normalization::NormalizationType;
    use crate::pipeline;

    fn triangle() -> MeshInput {
        MeshInput::new("tri", vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.5]])
            .with_group("shapes")
            .with_faces(vec![[0, 1, 2]])
    }

    #[test]
    fn writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ArtifactSink::new(dir.path());
        let result = pipeline::run(&triangle(), NormalizationType::MinMax, 256).unwrap();
        sink.accept(&result).unwrap();

        let run_dir = dir.path().join("shapes").join("tri").join("minmax");
        assert_eq!(sink.run_dir(&result), run_dir);
        for name in [QUANTIZED_FILE_NAME, VERTICES_FILE_NAME, SUMMARY_JSON_NAME, SUMMARY_TEXT_NAME, "tri_reconstructed.ply"] {
            assert!(run_dir.join(name).is_file(), "missing {name}");
        }

        let (strategy, quantized) = payload::load_quantized(run_dir.join(QUANTIZED_FILE_NAME)).unwrap();
        assert_eq!(strategy, NormalizationType::MinMax);
        assert_eq!(quantized, result.quantized);
        assert_eq!(payload::load_vertices(run_dir.join(VERTICES_FILE_NAME)).unwrap(), result.reconstructed);

        let summary = Summary::read_json(run_dir.join(SUMMARY_JSON_NAME)).unwrap();
        assert_eq!(summary.mesh, "tri");
        assert_eq!(summary.n_vertices, 3);
        assert_eq!(summary.source, None);
    }

    #[test]
    fn plan_decides_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let plan = vec![DiscoveredMesh {
            path: PathBuf::from("samples/shapes/tri.obj"),
            name: "tri".to_owned(),
            group: "shapes".to_owned(),
            out_dir: dir.path().join("custom"),
        }];
        let sink = ArtifactSink::from_plan(dir.path(), &plan);
        let result = pipeline::run(&triangle(), NormalizationType::UnitSphere, 256).unwrap();
        sink.accept(&result).unwrap();

        let run_dir = dir.path().join("custom").join("unit_sphere");
        let summary = Summary::read_json(run_dir.join(SUMMARY_JSON_NAME)).unwrap();
        assert_eq!(summary.source.as_deref(), Some("samples/shapes/tri.obj"));
    }
}
