use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::core::mesh::Face;
use crate::core::shared::Vertex;

/// Writes an ASCII ply. With a non-empty face list the output is a triangle mesh,
/// otherwise it is a point cloud with only a vertex element.
pub fn write_ply<W: Write>(writer: &mut W, vertices: &[Vertex], faces: Option<&[Face]>) -> io::Result<()> {
    let faces = faces.filter(|f| !f.is_empty());

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", vertices.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    if let Some(faces) = faces {
        writeln!(writer, "element face {}", faces.len())?;
        writeln!(writer, "property list uchar int vertex_indices")?;
    }
    writeln!(writer, "end_header")?;

    for v in vertices {
        writeln!(writer, "{} {} {}", v[0], v[1], v[2])?;
    }
    for f in faces.unwrap_or_default() {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }
    Ok(())
}

pub fn save_ply<P: AsRef<Path>>(path: P, vertices: &[Vertex], faces: Option<&[Face]>) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_ply(&mut file, vertices, faces)?;
    file.flush()
}
