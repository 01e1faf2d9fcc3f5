/// Loads `.obj` files into [MeshInput](crate::core::mesh::MeshInput)s.
pub mod obj;

/// Writes reconstructed geometry as ASCII ply.
pub mod ply;

/// Binary format for quantized buffers and reconstructed vertices.
pub mod payload;

/// Per-run summary records, as json and as plain text.
pub mod summary;

/// Finds meshes on disk and decides where their outputs go.
pub mod discover;

/// Collects summaries of many runs into tables.
pub mod aggregate;
