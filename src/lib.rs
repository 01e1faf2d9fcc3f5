/// Contains the vertex buffer types, mesh inputs and the byte coder shared by every layer.
pub mod core;

/// Defines the invertible normalization strategies.
pub mod normalization;

/// Defines the fixed-width integer quantizer.
pub mod quantization;

/// Computes reconstruction error metrics.
pub mod eval;

/// Runs normalize, quantize, dequantize and denormalize for a single mesh.
pub mod pipeline;

/// Runs the pipeline over many meshes and strategies on a bounded worker pool.
pub mod batch;

/// Contains the interface between the pipeline and files on disk:
/// obj loading, ply export, quantized payloads, summaries and aggregation.
pub mod io;

/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::core::mesh::{Face, FaceList, MeshInput, VertexStats};
    pub use crate::core::shared::{ConfigType, Vertex};
    pub use crate::core::bit_coder::{ByteReader, ByteWriter};
    pub use crate::eval::ErrorReport;
    pub use crate::normalization::{NormalizationImpl, NormalizationMeta, NormalizationType};
    pub use crate::quantization::{QuantizedBuffer, Quantizer};
    pub use crate::pipeline::{self, run, PipelineResult};
    pub use crate::batch::{ArtifactSink, ResultSink};
}
