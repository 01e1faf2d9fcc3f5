use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::shared::{self, Vertex, NUM_AXES};

/// A face as three indices into the vertex buffer it was loaded with.
pub type Face = [usize; 3];

/// Faces are never inspected by the pipeline; they are shared between the input
/// and every result produced from it.
pub type FaceList = Arc<[Face]>;

/// A mesh as seen by the pipeline: an ordered vertex buffer, an optional opaque face list,
/// and two free-form labels supplied by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshInput {
    id: String,
    group: String,
    vertices: Vec<Vertex>,
    faces: Option<FaceList>,
}

impl MeshInput {
    pub fn new(id: impl Into<String>, vertices: Vec<Vertex>) -> Self {
        Self {
            id: id.into(),
            group: String::from("root"),
            vertices,
            faces: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_faces(mut self, faces: impl Into<FaceList>) -> Self {
        self.faces = Some(faces.into());
        self
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_group(&self) -> &str {
        &self.group
    }

    pub fn get_vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn get_faces(&self) -> Option<&FaceList> {
        self.faces.as_ref()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn stats(&self) -> VertexStats {
        VertexStats::from_vertices(&self.vertices)
    }
}


/// Per-axis summary of a vertex buffer. `std` is the population standard deviation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexStats {
    pub n_vertices: usize,
    pub min: Vertex,
    pub max: Vertex,
    pub mean: Vertex,
    pub std: Vertex,
}

impl VertexStats {
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        if vertices.is_empty() {
            return Self::default();
        }
        let (min, max) = shared::axis_bounds(vertices);
        let mean = shared::axis_mean(vertices);
        let mut var = [0.0; NUM_AXES];
        for v in vertices {
            for i in 0..NUM_AXES {
                let d = v[i] - mean[i];
                var[i] += d * d;
            }
        }
        let n = vertices.len() as f64;
        Self {
            n_vertices: vertices.len(),
            min,
            max,
            mean,
            std: var.map(|s| (s / n).sqrt()),
        }
    }
}
