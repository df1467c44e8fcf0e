use engine_core::EntityId;

use crate::vertex_kind::VertexKind;

/// Errors raised by the vertex-data engine.
///
/// All of them are fatal to the single operation that raised them and are
/// reported before any target geometry is touched.
#[derive(Debug, thiserror::Error)]
pub enum VertexDataError {
    #[error("positions are required")]
    MissingPositions,

    #[error("the {kind} array length ({len}) must be a multiple of {stride}")]
    InvalidStride {
        kind: VertexKind,
        len: usize,
        stride: usize,
    },

    #[error("the {kind} element count ({count}) does not match the positions count ({positions})")]
    CountMismatch {
        kind: VertexKind,
        count: usize,
        positions: usize,
    },

    #[error("cannot merge vertex data that do not have the same set of attributes ({kind} differs)")]
    AttributeMismatch { kind: VertexKind },

    #[error("{0} is not a mesh")]
    NotAMesh(EntityId),

    #[error("nothing to merge")]
    EmptyMerge,

    #[error("vertex data serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VertexDataError>;
