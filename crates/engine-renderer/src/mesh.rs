use std::sync::Arc;

use engine_core::ecs::Component;
use parking_lot::RwLock;

use crate::geometry::{Geometry, GeometryOwner};
use crate::index_buffer::IndexBuffer;
use crate::vertex_data::VertexData;
use crate::vertex_kind::VertexKind;

/// Named handle to a geometry.
///
/// Meshes created with [`Mesh::instantiate_shared`] point at the same
/// geometry, so binding data through one of them changes all of them.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    geometry: Arc<RwLock<Geometry>>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: Arc::new(RwLock::new(Geometry::new())),
        }
    }

    /// Build a mesh and bind `data` to it.
    pub fn from_vertex_data(
        name: impl Into<String>,
        data: &VertexData,
        updatable: bool,
    ) -> crate::error::Result<Self> {
        let mut mesh = Self::new(name);
        data.apply_to_mesh(&mut mesh, updatable)?;
        Ok(mesh)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// New mesh sharing this mesh's geometry.
    pub fn instantiate_shared(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: Arc::clone(&self.geometry),
        }
    }

    pub fn is_geometry_shared(&self) -> bool {
        Arc::strong_count(&self.geometry) > 1
    }

    pub fn shares_geometry_with(&self, other: &Mesh) -> bool {
        Arc::ptr_eq(&self.geometry, &other.geometry)
    }

    /// Detach from sibling meshes by taking a private copy of the geometry.
    pub fn make_geometry_unique(&mut self) {
        if self.is_geometry_shared() {
            let copy = self.geometry.read().clone();
            self.geometry = Arc::new(RwLock::new(copy));
            log::debug!("mesh '{}' detached its geometry", self.name);
        }
    }

    /// Read access to the geometry, e.g. for picking or upload.
    pub fn geometry(&self) -> parking_lot::RwLockReadGuard<'_, Geometry> {
        self.geometry.read()
    }

    pub fn total_vertices(&self) -> usize {
        self.geometry.read().total_vertices()
    }
}

impl Component for Mesh {}

impl GeometryOwner for Mesh {
    fn set_vertices_data(&mut self, kind: VertexKind, data: &[f32], updatable: bool) {
        self.geometry.write().set_vertices_data(kind, data, updatable);
    }

    fn update_vertices_data(
        &mut self,
        kind: VertexKind,
        data: &[f32],
        update_extends: bool,
        make_it_unique: bool,
    ) {
        if make_it_unique {
            self.make_geometry_unique();
        }
        self.geometry
            .write()
            .update_vertices_data(kind, data, update_extends, false);
    }

    fn set_indices(&mut self, indices: Arc<IndexBuffer>, total_vertices: Option<usize>, updatable: bool) {
        self.geometry.write().set_indices(indices, total_vertices, updatable);
    }

    fn is_vertices_data_present(&self, kind: VertexKind) -> bool {
        self.geometry.read().is_vertices_data_present(kind)
    }

    fn get_vertices_data(
        &self,
        kind: VertexKind,
        copy_when_shared: bool,
        force_copy: bool,
    ) -> Option<Arc<Vec<f32>>> {
        let force_copy = force_copy || (copy_when_shared && self.is_geometry_shared());
        self.geometry
            .read()
            .get_vertices_data(kind, copy_when_shared, force_copy)
    }

    fn get_indices(&self, copy_when_shared: bool, force_copy: bool) -> Option<Arc<IndexBuffer>> {
        let force_copy = force_copy || (copy_when_shared && self.is_geometry_shared());
        self.geometry.read().get_indices(copy_when_shared, force_copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> VertexData {
        VertexData::from_positions(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            Some(vec![0, 1, 2]),
        )
    }

    #[test]
    fn test_from_vertex_data() {
        let mesh = Mesh::from_vertex_data("tri", &triangle(), false).unwrap();
        assert_eq!(mesh.name(), "tri");
        assert_eq!(mesh.total_vertices(), 3);
        assert!(mesh.is_vertices_data_present(VertexKind::Position));
        assert!(!mesh.is_geometry_shared());
    }

    #[test]
    fn test_shared_geometry_sees_applies() {
        let mut a = Mesh::from_vertex_data("a", &triangle(), true).unwrap();
        let b = a.instantiate_shared("b");
        assert!(a.shares_geometry_with(&b));

        let mut bigger = triangle();
        bigger.set(VertexKind::Uv, vec![0.0; 6]);
        bigger.apply_to_mesh(&mut a, true).unwrap();
        assert!(b.is_vertices_data_present(VertexKind::Uv));
    }

    #[test]
    fn test_update_make_it_unique_detaches() {
        let mut a = Mesh::from_vertex_data("a", &triangle(), true).unwrap();
        let b = a.instantiate_shared("b");

        let mut moved = triangle();
        moved.transform(&glam::Mat4::from_translation(glam::Vec3::X));
        moved.update_mesh(&mut a, true, true).unwrap();

        assert!(!a.shares_geometry_with(&b));
        assert_eq!(a.geometry().positions().unwrap()[0], 1.0);
        assert_eq!(b.geometry().positions().unwrap()[0], 0.0);
    }

    #[test]
    fn test_copy_when_shared() {
        let a = Mesh::from_vertex_data("a", &triangle(), false).unwrap();
        let aliased = a.get_vertices_data(VertexKind::Position, true, false).unwrap();
        let _sibling = a.instantiate_shared("b");
        let copied = a.get_vertices_data(VertexKind::Position, true, false).unwrap();
        assert!(!Arc::ptr_eq(&aliased, &copied));
        assert_eq!(aliased, copied);
    }
}
