pub mod builders;
pub mod camera;
pub mod error;
pub mod geometry;
pub mod gizmo;
pub mod index_buffer;
pub mod mesh;
pub mod observable;
pub mod picking;
pub mod pointer;
pub mod scene;
pub mod utility_layer;
pub mod vertex_data;
pub mod vertex_kind;

pub use camera::Camera;
pub use error::{Result, VertexDataError};
pub use geometry::{Geometry, GeometryOwner};
pub use gizmo::{GizmoAxis, PositionGizmo};
pub use index_buffer::IndexBuffer;
pub use mesh::Mesh;
pub use observable::{EventState, Observable, ObserverId};
pub use picking::{PickingInfo, Ray, AABB};
pub use pointer::{PointerEvent, PointerEventType, PointerId, PointerInfo, PointerInfoPre};
pub use scene::{PointerDispatch, Scene, SceneId};
pub use utility_layer::{
    PickSource, PointerArbitration, UtilityLayerOptions, UtilityLayerRegistry, UtilityLayerRenderer,
};
pub use vertex_data::{MergeOptions, SideOrientation, VertexData};
pub use vertex_kind::VertexKind;

// Re-export glam types for consistent version usage
pub use glam;
