// use tobj to load the obj file and convert it to the pipeline's mesh input
use std::fmt::{Debug, Write};
use std::fs;
use std::io;
use std::path::Path;

use crate::core::mesh::{Face, MeshInput};
use crate::core::shared::Vertex;

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Failed to read OBJ file '{path}': {source}")]
    IoError {
        path: String,
        source: io::Error,
    },
    #[error("Failed to load OBJ file '{path}': {source}")]
    LoadError {
        path: String,
        source: tobj::LoadError,
    },
}

/// Label used for meshes that sit directly in the scanned directory.
pub const ROOT_GROUP: &str = "root";

/// Mesh id inferred from a path: the file stem.
pub fn mesh_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Group inferred from a path: the name of the parent directory, or [ROOT_GROUP].
pub fn parent_group<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ROOT_GROUP.to_owned())
}

/// Loads an obj file; the id is the file stem and the group the parent directory's name.
pub fn load_obj<P: AsRef<Path> + Debug>(path: P) -> Result<MeshInput, Err> {
    let id = mesh_name(&path);
    let group = parent_group(&path);
    load_obj_as(path, id, group)
}

/// Loads an obj file under the given id and group.
///
/// Every `v` record becomes a vertex, in file order, whether or not a face uses it, and
/// face indices refer to those vertices. Polygons are triangulated; points and lines are
/// ignored. A file without faces is a point cloud with `faces == None`.
pub fn load_obj_as<P: AsRef<Path> + Debug>(path: P, id: impl Into<String>, group: impl Into<String>) -> Result<MeshInput, Err> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|source| Err::IoError { path: path.display().to_string(), source })?;
    let (vertices, faces) = parse_obj(&text)
        .map_err(|source| Err::LoadError { path: path.display().to_string(), source })?;

    let mesh = MeshInput::new(id, vertices).with_group(group);
    if faces.is_empty() {
        Ok(mesh)
    } else {
        Ok(mesh.with_faces(faces))
    }
}

/// Keywords after which tobj starts a new model.
const MODEL_BREAKS: [&str; 4] = ["o", "g", "usemtl", "mtllib"];

/// Parses obj source into a vertex buffer in file order and its triangles.
///
/// tobj only emits the positions a model's faces reference, in first-reference order. The
/// source is therefore fed to it as a single model that starts with one point element per
/// `v` record: every position is then referenced, in file order, before any real face.
fn parse_obj(text: &str) -> Result<(Vec<Vertex>, Vec<Face>), tobj::LoadError> {
    let mut num_vertices = 0;
    let mut body = String::with_capacity(text.len());
    for line in text.lines() {
        match line.split_whitespace().next() {
            Some("v") => num_vertices += 1,
            Some(keyword) if MODEL_BREAKS.contains(&keyword) => continue,
            _ => {},
        }
        body.push_str(line);
        body.push('\n');
    }

    let mut source = String::with_capacity(body.len() + num_vertices * 8);
    for i in 1..=num_vertices {
        // writing to a String cannot fail
        let _ = writeln!(source, "f {i}");
    }
    source.push_str(&body);

    let op = tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ignore_points: false,
        ignore_lines: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj_buf(&mut source.as_bytes(), &op, |_| Err(tobj::LoadError::OpenFileFailed))?;

    let mut vertices: Vec<Vertex> = Vec::with_capacity(num_vertices);
    let mut faces: Vec<Face> = Vec::new();
    for model in &models {
        vertices.extend(
            model.mesh.positions.chunks_exact(3)
                .map(|x| [x[0] as f64, x[1] as f64, x[2] as f64])
        );
        // the leading point elements come out as `[i, i, i]`; points in the file do too
        faces.extend(
            model.mesh.indices.chunks_exact(3)
                .map(|x| [x[0] as usize, x[1] as usize, x[2] as usize])
                .filter(|f| !(f[0] == f[1] && f[1] == f[2]))
        );
    }
    Ok((vertices, faces))
}
