/// Contains the byte-level writer and reader used by the payload codec.
pub mod bit_coder;

/// Contains the mesh input handed to the pipeline and its summary statistics.
pub mod mesh;

/// Contains the vertex type, the configuration trait and small vector helpers.
pub mod shared;
