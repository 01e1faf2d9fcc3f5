use std::fmt;

use rayon::prelude::*;
use serde::Serialize;

use crate::core::mesh::MeshInput;
use crate::core::shared::ConfigType;
use crate::eval::ErrorReport;
use crate::io::discover::DiscoveredMesh;
use crate::io::obj;
use crate::normalization::NormalizationType;
use crate::pipeline::{self, ErrorKind};

pub mod sink;
pub use sink::{ArtifactSink, NullSink, ResultSink};

#[remain::sorted]
#[derive(thiserror::Error, Debug)]
pub enum Err {
    #[error("Failed to build the worker pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}


#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub pipeline: pipeline::Config,
    /// Size of the worker pool. `0` lets rayon decide.
    pub num_threads: usize,
}

impl ConfigType for Config {
    fn default() -> Self {
        Self {
            pipeline: pipeline::Config::default(),
            num_threads: 0,
        }
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Load,
    Pipeline(ErrorKind),
    Sink,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Load => f.write_str("Load"),
            FailureKind::Pipeline(kind) => write!(f, "{kind}"),
            FailureKind::Sink => f.write_str("Sink"),
        }
    }
}

/// A run (or a whole mesh, when loading failed) that produced no result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunFailure {
    pub mesh_id: String,
    pub group: String,
    /// `None` when the mesh could not be loaded.
    pub strategy: Option<NormalizationType>,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub mesh_id: String,
    pub group: String,
    pub strategy: NormalizationType,
    pub vertex_count: usize,
    pub bins: u64,
    pub error: ErrorReport,
}

/// A mesh without vertices. It is not run, so it never reaches a sink or an aggregate.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SkippedMesh {
    pub group: String,
    pub mesh_id: String,
}

/// Outcome of a batch, sorted by (group, mesh id, strategy).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<RunSummary>,
    pub failures: Vec<RunFailure>,
    pub skipped: Vec<SkippedMesh>,
}

enum Outcome {
    Done(RunSummary),
    Failed(RunFailure),
    Skipped(SkippedMesh),
}

impl From<Result<RunSummary, RunFailure>> for Outcome {
    fn from(result: Result<RunSummary, RunFailure>) -> Self {
        match result {
            Ok(summary) => Outcome::Done(summary),
            Err(failure) => Outcome::Failed(failure),
        }
    }
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<Outcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Done(summary) => report.results.push(summary),
                Outcome::Failed(failure) => report.failures.push(failure),
                Outcome::Skipped(mesh) => report.skipped.push(mesh),
            }
        }
        report.skipped.sort();
        report.results.sort_by(|a, b| {
            (&a.group, &a.mesh_id, a.strategy).cmp(&(&b.group, &b.mesh_id, b.strategy))
        });
        report.failures.sort_by(|a, b| {
            (&a.group, &a.mesh_id, a.strategy).cmp(&(&b.group, &b.mesh_id, b.strategy))
        });
        report
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}


fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, Err> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("meshquant-worker-{i}"))
        .build()?)
}

/// Runs every configured strategy on every mesh, in parallel over (mesh, strategy) pairs.
/// Failed runs are logged and reported; they never stop the other runs. Meshes without
/// vertices are skipped.
pub fn run_batch<S>(meshes: &[MeshInput], cfg: &Config, sink: &S) -> Result<BatchReport, Err>
    where S: ResultSink,
{
    let pool = build_pool(cfg.num_threads)?;
    let (empty, meshes): (Vec<&MeshInput>, Vec<&MeshInput>) = meshes.iter().partition(|m| m.is_empty());
    let pairs = meshes.into_iter()
        .flat_map(|mesh| cfg.pipeline.strategies.iter().map(move |&s| (mesh, s)))
        .collect::<Vec<_>>();

    let mut outcomes = pool.install(|| {
        pairs.into_par_iter()
            .map(|(mesh, strategy)| Outcome::from(run_one(mesh, strategy, cfg.pipeline.bins, sink)))
            .collect::<Vec<_>>()
    });
    outcomes.extend(empty.into_iter().map(|mesh| skip_empty(mesh.get_id(), mesh.get_group())));
    Ok(BatchReport::from_outcomes(outcomes))
}

fn skip_empty(mesh_id: &str, group: &str) -> Outcome {
    tracing::info!(mesh = mesh_id, group, "skipping empty mesh");
    Outcome::Skipped(SkippedMesh { group: group.to_owned(), mesh_id: mesh_id.to_owned() })
}

/// Loads and processes each discovered mesh on the worker pool. A mesh that cannot be
/// loaded is reported once, with no strategy, and skipped. So is a mesh without vertices,
/// as a [SkippedMesh].
pub fn run_discovered<S>(plan: &[DiscoveredMesh], cfg: &Config, sink: &S) -> Result<BatchReport, Err>
    where S: ResultSink,
{
    let pool = build_pool(cfg.num_threads)?;
    let outcomes = pool.install(|| {
        plan.par_iter()
            .flat_map_iter(|mesh| process_discovered(mesh, cfg, sink))
            .collect::<Vec<_>>()
    });
    Ok(BatchReport::from_outcomes(outcomes))
}

fn process_discovered<S>(mesh: &DiscoveredMesh, cfg: &Config, sink: &S) -> Vec<Outcome>
    where S: ResultSink,
{
    let input = match obj::load_obj_as(&mesh.path, mesh.name.as_str(), mesh.group.as_str()) {
        Ok(input) => input,
        Err(e) => {
            tracing::error!(mesh = %mesh.name, group = %mesh.group, kind = %FailureKind::Load, error = %e, "failed to load mesh");
            return vec![Outcome::Failed(RunFailure {
                mesh_id: mesh.name.clone(),
                group: mesh.group.clone(),
                strategy: None,
                kind: FailureKind::Load,
                message: e.to_string(),
            })];
        },
    };

    if input.is_empty() {
        return vec![skip_empty(&mesh.name, &mesh.group)];
    }

    let stats = input.stats();
    tracing::info!(
        mesh = %mesh.name,
        group = %mesh.group,
        path = %mesh.path.display(),
        n_vertices = stats.n_vertices,
        min = ?stats.min,
        max = ?stats.max,
        mean = ?stats.mean,
        std = ?stats.std,
        "loaded mesh"
    );

    cfg.pipeline.strategies.iter()
        .map(|&strategy| Outcome::from(run_one(&input, strategy, cfg.pipeline.bins, sink)))
        .collect()
}

fn run_one<S>(input: &MeshInput, strategy: NormalizationType, bins: u64, sink: &S) -> Result<RunSummary, RunFailure>
    where S: ResultSink,
{
    let failure = |kind: FailureKind, message: String| {
        tracing::error!(
            mesh = input.get_id(),
            group = input.get_group(),
            strategy = strategy.name(),
            kind = %kind,
            error = %message,
            "run failed"
        );
        RunFailure {
            mesh_id: input.get_id().to_owned(),
            group: input.get_group().to_owned(),
            strategy: Some(strategy),
            kind,
            message,
        }
    };

    let result = pipeline::run(input, strategy, bins)
        .map_err(|e| failure(FailureKind::Pipeline(e.kind()), e.to_string()))?;
    sink.accept(&result)
        .map_err(|e| failure(FailureKind::Sink, e.to_string()))?;

    tracing::info!(
        mesh = input.get_id(),
        group = input.get_group(),
        strategy = strategy.name(),
        mse = result.error.mse,
        mae = result.error.mae,
        "run finished"
    );
    Ok(RunSummary {
        mesh_id: result.mesh_id,
        group: result.group,
        strategy,
        vertex_count: result.vertex_count,
        bins: result.bins,
        error: result.error,
    })
}


#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::pipeline::PipelineResult;

    #[derive(thiserror::Error, Debug)]
    #[error("refused {0}")]
    struct Refused(String);

    /// Keeps every result and refuses the meshes listed in `refuse`.
    #[derive(Default)]
    struct Collect {
        refuse: Vec<&'static str>,
        results: Mutex<Vec<PipelineResult>>,
    }

    impl ResultSink for Collect {
        type Err = Refused;

        fn accept(&self, result: &PipelineResult) -> Result<(), Refused> {
            if self.refuse.contains(&result.mesh_id.as_str()) {
                return Err(Refused(result.mesh_id.clone()));
            }
            self.results.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    fn mesh(id: &str, offset: f64) -> MeshInput {
        MeshInput::new(id, vec![[offset, 0.0, 1.0], [2.0, offset, 0.5], [-1.0, 3.0, offset]])
    }

    fn config(threads: usize) -> Config {
        Config { num_threads: threads, ..ConfigType::default() }
    }

    #[test]
    fn every_pair_runs_once() {
        let meshes = vec![mesh("b", 0.3), mesh("a", 0.1), mesh("c", 0.7)];
        let sink = Collect::default();
        let report = run_batch(&meshes, &config(4), &sink).unwrap();

        assert!(report.is_success());
        assert_eq!(report.results.len(), 6);
        assert_eq!(sink.results.lock().unwrap().len(), 6);
        let order = report.results.iter()
            .map(|r| (r.mesh_id.as_str(), r.strategy))
            .collect::<Vec<_>>();
        assert_eq!(order, vec![
            ("a", NormalizationType::MinMax), ("a", NormalizationType::UnitSphere),
            ("b", NormalizationType::MinMax), ("b", NormalizationType::UnitSphere),
            ("c", NormalizationType::MinMax), ("c", NormalizationType::UnitSphere),
        ]);
    }

    #[test]
    fn failures_do_not_leak_into_other_runs() {
        let alone = Collect::default();
        run_batch(&[mesh("a", 0.1)], &config(1), &alone).unwrap();

        let together = Collect { refuse: vec!["b"], ..Default::default() };
        let report = run_batch(&[mesh("a", 0.1), mesh("b", 0.3)], &config(4), &together).unwrap();

        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.mesh_id == "b" && f.kind == FailureKind::Sink));

        let mut alone = alone.results.into_inner().unwrap();
        let mut together = together.results.into_inner().unwrap();
        alone.sort_by_key(|r| r.strategy);
        together.sort_by_key(|r| r.strategy);
        assert_eq!(alone, together);
    }

    #[test]
    fn invalid_bins_fail_every_run() {
        let mut cfg = config(2);
        cfg.pipeline.bins = 1;
        let report = run_batch(&[mesh("a", 0.1)], &cfg, &NullSink).unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter()
            .all(|f| f.kind == FailureKind::Pipeline(ErrorKind::InvalidConfiguration)));
    }

    #[test]
    fn empty_meshes_are_skipped() {
        let meshes = vec![mesh("a", 0.1), MeshInput::new("hollow", Vec::new()).with_group("g")];
        let sink = Collect::default();
        let report = run_batch(&meshes, &config(2), &sink).unwrap();

        assert!(report.is_success());
        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.mesh_id == "a"));
        assert_eq!(report.skipped, vec![SkippedMesh { group: "g".to_owned(), mesh_id: "hollow".to_owned() }]);
        assert!(sink.results.lock().unwrap().iter().all(|r| r.vertex_count > 0));
    }

    #[test]
    fn empty_obj_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.obj");
        std::fs::write(&path, "# no geometry\n").unwrap();
        let plan = vec![DiscoveredMesh {
            path,
            name: "blank".to_owned(),
            group: "root".to_owned(),
            out_dir: dir.path().join("out"),
        }];
        let report = run_discovered(&plan, &config(1), &NullSink).unwrap();
        assert!(report.results.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn unloadable_meshes_are_skipped() {
        let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data");
        let plan = vec![
            DiscoveredMesh {
                path: data.join("cube.obj"),
                name: "cube".to_owned(),
                group: "data".to_owned(),
                out_dir: PathBuf::from("unused"),
            },
            DiscoveredMesh {
                path: data.join("missing.obj"),
                name: "missing".to_owned(),
                group: "data".to_owned(),
                out_dir: PathBuf::from("unused"),
            },
        ];
        let report = run_discovered(&plan, &config(2), &NullSink).unwrap();

        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.mesh_id == "cube" && r.vertex_count == 8));
        assert_eq!(report.failures, vec![RunFailure {
            mesh_id: "missing".to_owned(),
            group: "data".to_owned(),
            strategy: None,
            kind: FailureKind::Load,
            message: report.failures[0].message.clone(),
        }]);
    }
}
