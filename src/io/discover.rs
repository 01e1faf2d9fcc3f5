use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::shared::ConfigType;
use super::obj::{mesh_name, parent_group, ROOT_GROUP};

#[remain::sorted]
#[derive(thiserror::Error, Debug)]
pub enum Err {
    #[error("'{first}' and '{second}' would both write to '{out_dir}'")]
    DuplicateOutput {
        out_dir: String,
        first: String,
        second: String,
    },
    #[error("IO error while scanning '{path}': {source}")]
    IoError {
        path: String,
        source: io::Error,
    },
    #[error("Sample path not found: {0}")]
    SampleNotFound(String),
    #[error("Unclosed '{{' in output template '{0}'")]
    UnclosedTemplateKey(String),
    #[error("Unknown key '{0}' in output template (available keys: out_dir, group, name)")]
    UnknownTemplateKey(String),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> Err + '_ {
    move |source| Err::IoError { path: path.display().to_string(), source }
}


/// Output path template with the keys `{out_dir}`, `{group}` and `{name}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutTemplate {
    template: String,
}

impl OutTemplate {
    const KEYS: [&'static str; 3] = ["out_dir", "group", "name"];
    pub const DEFAULT: &'static str = "{out_dir}/{group}/{name}";

    pub fn new(template: impl Into<String>) -> Result<Self, Err> {
        let template = template.into();
        let mut rest = template.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                return Err(Err::UnclosedTemplateKey(template.clone()));
            };
            let key = &after[..end];
            if !Self::KEYS.contains(&key) {
                return Err(Err::UnknownTemplateKey(key.to_owned()));
            }
            rest = &after[end + 1..];
        }
        Ok(Self { template })
    }

    pub fn expand(&self, out_dir: &Path, group: &str, name: &str) -> PathBuf {
        let out = self.template
            .replace("{out_dir}", &out_dir.display().to_string())
            .replace("{group}", group)
            .replace("{name}", name);
        PathBuf::from(out)
    }
}

impl Default for OutTemplate {
    fn default() -> Self {
        Self { template: Self::DEFAULT.to_owned() }
    }
}


/// How the input directory is scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Every `.obj` below the input directory; outputs go to `<out_dir>/<name>`.
    Flat,
    /// Each immediate subdirectory is a group; outputs go to `<out_dir>/<group>/<name>`.
    /// Falls back to [Mode::Flat] when there are no subdirectories.
    GroupByDir,
    /// A single file or directory, absolute or relative to the input directory.
    /// Outputs are placed with the [OutTemplate].
    Sample(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub input_dir: PathBuf,
    pub out_dir: PathBuf,
    pub mode: Mode,
    pub template: OutTemplate,
}

impl ConfigType for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("samples"),
            out_dir: PathBuf::from("outputs"),
            mode: Mode::Flat,
            template: OutTemplate::default(),
        }
    }
}

/// A mesh file and the directory its per-method outputs are written under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredMesh {
    pub path: PathBuf,
    pub name: String,
    pub group: String,
    pub out_dir: PathBuf,
}


/// Recursively lists the `.obj` files below `dir`, sorted by path.
pub fn find_obj_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, Err> {
    let mut out = Vec::new();
    collect_obj_files(dir.as_ref(), &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_obj_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), Err> {
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_dir() {
            collect_obj_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "obj") {
            out.push(path);
        }
    }
    Ok(())
}

/// Lists the meshes to process under the given configuration.
///
/// Fails when two meshes would share an output directory, e.g. `a/cube.obj` and
/// `b/cube.obj` in flat mode.
pub fn plan(cfg: &Config) -> Result<Vec<DiscoveredMesh>, Err> {
    let meshes = match &cfg.mode {
        Mode::Flat => plan_flat(cfg)?,
        Mode::GroupByDir => plan_grouped(cfg)?,
        Mode::Sample(sample) => plan_sample(cfg, sample)?,
    };
    check_unique_outputs(&meshes)?;
    Ok(meshes)
}

fn check_unique_outputs(meshes: &[DiscoveredMesh]) -> Result<(), Err> {
    let mut seen: HashMap<&Path, &Path> = HashMap::new();
    for mesh in meshes {
        if let Some(first) = seen.insert(&mesh.out_dir, &mesh.path) {
            return Err(Err::DuplicateOutput {
                out_dir: mesh.out_dir.display().to_string(),
                first: first.display().to_string(),
                second: mesh.path.display().to_string(),
            });
        }
    }
    Ok(())
}

fn plan_flat(cfg: &Config) -> Result<Vec<DiscoveredMesh>, Err> {
    let files = find_obj_files(&cfg.input_dir)?;
    Ok(files.into_iter()
        .map(|path| {
            let name = mesh_name(&path);
            let group = relative_group(&cfg.input_dir, &path);
            let out_dir = cfg.out_dir.join(&name);
            DiscoveredMesh { path, name, group, out_dir }
        })
        .collect())
}

fn plan_grouped(cfg: &Config) -> Result<Vec<DiscoveredMesh>, Err> {
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(&cfg.input_dir).map_err(io_err(&cfg.input_dir))? {
        let path = entry.map_err(io_err(&cfg.input_dir))?.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    subdirs.sort();

    if subdirs.is_empty() {
        tracing::info!(
            input_dir = %cfg.input_dir.display(),
            "no subdirectories to group by, falling back to a flat scan"
        );
        return plan_flat(cfg);
    }

    let mut out = Vec::new();
    for dir in subdirs {
        let group = mesh_dir_name(&dir);
        let files = find_obj_files(&dir)?;
        if files.is_empty() {
            tracing::info!(dir = %dir.display(), "no .obj files in subdirectory, skipping");
            continue;
        }
        let group_out = cfg.out_dir.join(&group);
        out.extend(files.into_iter().map(|path| {
            let name = mesh_name(&path);
            let out_dir = group_out.join(&name);
            DiscoveredMesh { path, name, group: group.clone(), out_dir }
        }));
    }
    Ok(out)
}

fn plan_sample(cfg: &Config, sample: &Path) -> Result<Vec<DiscoveredMesh>, Err> {
    let path = if sample.is_absolute() {
        sample.to_path_buf()
    } else {
        cfg.input_dir.join(sample)
    };

    if path.is_file() {
        let name = mesh_name(&path);
        let group = parent_group(&path);
        let out_dir = cfg.template.expand(&cfg.out_dir, &group, &name);
        return Ok(vec![DiscoveredMesh { path, name, group, out_dir }]);
    }
    if path.is_dir() {
        let group = mesh_dir_name(&path);
        let files = find_obj_files(&path)?;
        return Ok(files.into_iter()
            .map(|path| {
                let name = mesh_name(&path);
                let out_dir = cfg.template.expand(&cfg.out_dir, &group, &name);
                DiscoveredMesh { path, name, group: group.clone(), out_dir }
            })
            .collect());
    }
    Err(Err::SampleNotFound(sample.display().to_string()))
}

fn mesh_dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| ROOT_GROUP.to_owned())
}

/// First directory component of `path` below `root`, or [ROOT_GROUP] for files directly in `root`.
fn relative_group(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut components = rel.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
        _ => ROOT_GROUP.to_owned(),
    }
}
