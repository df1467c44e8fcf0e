//! Geometry storage and the owner contract vertex data is applied through.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::index_buffer::IndexBuffer;
use crate::picking::AABB;
use crate::vertex_kind::VertexKind;

/// Anything vertex data can be bound to.
///
/// Implemented by [`Geometry`] directly and by [`Mesh`](crate::mesh::Mesh),
/// which forwards to its (possibly shared) geometry.
pub trait GeometryOwner {
    /// Replace the buffer of `kind`.
    fn set_vertices_data(&mut self, kind: VertexKind, data: &[f32], updatable: bool);

    /// Overwrite an existing buffer of `kind`. Missing buffers are ignored.
    ///
    /// `update_extends` recomputes the bounds from new positions;
    /// `make_it_unique` detaches shared storage before writing.
    fn update_vertices_data(
        &mut self,
        kind: VertexKind,
        data: &[f32],
        update_extends: bool,
        make_it_unique: bool,
    );

    fn set_indices(&mut self, indices: Arc<IndexBuffer>, total_vertices: Option<usize>, updatable: bool);

    fn is_vertices_data_present(&self, kind: VertexKind) -> bool;

    /// Read back a buffer. The result aliases storage unless `force_copy` is
    /// set, or `copy_when_shared` is set and the storage is shared.
    fn get_vertices_data(
        &self,
        kind: VertexKind,
        copy_when_shared: bool,
        force_copy: bool,
    ) -> Option<Arc<Vec<f32>>>;

    fn get_indices(&self, copy_when_shared: bool, force_copy: bool) -> Option<Arc<IndexBuffer>>;
}

#[derive(Debug, Clone)]
struct VertexBuffer {
    data: Arc<Vec<f32>>,
    updatable: bool,
}

/// Non-interleaved vertex buffers plus an optional index list.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    buffers: BTreeMap<VertexKind, VertexBuffer>,
    indices: Option<Arc<IndexBuffer>>,
    indices_updatable: bool,
    total_vertices: usize,
    extend: Option<AABB>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_vertices(&self) -> usize {
        self.total_vertices
    }

    /// Bounds of the positions, as of the last set or extending update.
    pub fn extend(&self) -> Option<AABB> {
        self.extend
    }

    pub fn is_updatable(&self, kind: VertexKind) -> bool {
        self.buffers.get(&kind).is_some_and(|b| b.updatable)
    }

    pub fn indices_updatable(&self) -> bool {
        self.indices_updatable
    }

    /// Present kinds in bind order.
    pub fn kinds(&self) -> impl Iterator<Item = VertexKind> + '_ {
        self.buffers.keys().copied()
    }

    pub fn positions(&self) -> Option<&[f32]> {
        self.buffers
            .get(&VertexKind::Position)
            .map(|b| b.data.as_slice())
    }

    /// Index list, if the geometry is indexed. An empty list reads as un-indexed.
    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.indices.as_deref().filter(|i| !i.is_empty())
    }

    /// Number of indices a draw call covers.
    pub fn index_count(&self) -> usize {
        self.index_buffer().map_or(self.total_vertices, IndexBuffer::len)
    }

    /// One attribute per present buffer, for building the pipeline layout.
    pub fn vertex_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.kinds().map(VertexKind::attribute).collect()
    }

    /// Raw bytes of the buffer of `kind`, ready for upload.
    pub fn vertex_bytes(&self, kind: VertexKind) -> Option<&[u8]> {
        self.buffers
            .get(&kind)
            .map(|b| bytemuck::cast_slice(b.data.as_slice()))
    }

    pub fn index_bytes(&self) -> Option<(&[u8], wgpu::IndexFormat)> {
        self.indices.as_deref().map(|i| (i.as_bytes(), i.format()))
    }

    fn refresh_extend(&mut self) {
        self.extend = self.positions().and_then(AABB::from_points);
    }
}

impl GeometryOwner for Geometry {
    fn set_vertices_data(&mut self, kind: VertexKind, data: &[f32], updatable: bool) {
        self.buffers.insert(
            kind,
            VertexBuffer {
                data: Arc::new(data.to_vec()),
                updatable,
            },
        );
        if kind == VertexKind::Position {
            self.total_vertices = data.len() / kind.stride();
            self.refresh_extend();
        }
    }

    fn update_vertices_data(
        &mut self,
        kind: VertexKind,
        data: &[f32],
        update_extends: bool,
        _make_it_unique: bool,
    ) {
        let Some(buffer) = self.buffers.get_mut(&kind) else {
            log::warn!("update of missing {kind} buffer ignored");
            return;
        };
        if !buffer.updatable {
            log::warn!("{kind} buffer is not updatable, replacing it");
        }

        // Readers holding the old Arc keep their snapshot.
        match Arc::get_mut(&mut buffer.data) {
            Some(target) => {
                target.clear();
                target.extend_from_slice(data);
            }
            None => buffer.data = Arc::new(data.to_vec()),
        }

        if kind == VertexKind::Position {
            self.total_vertices = data.len() / kind.stride();
            if update_extends {
                self.refresh_extend();
            }
        }
    }

    fn set_indices(&mut self, indices: Arc<IndexBuffer>, total_vertices: Option<usize>, updatable: bool) {
        self.indices = Some(indices);
        self.indices_updatable = updatable;
        if let Some(total) = total_vertices {
            self.total_vertices = total;
        }
    }

    fn is_vertices_data_present(&self, kind: VertexKind) -> bool {
        self.buffers.contains_key(&kind)
    }

    fn get_vertices_data(
        &self,
        kind: VertexKind,
        copy_when_shared: bool,
        force_copy: bool,
    ) -> Option<Arc<Vec<f32>>> {
        let data = &self.buffers.get(&kind)?.data;
        let shared = Arc::strong_count(data) > 1;
        if force_copy || (copy_when_shared && shared) {
            Some(Arc::new(data.as_ref().clone()))
        } else {
            Some(Arc::clone(data))
        }
    }

    fn get_indices(&self, copy_when_shared: bool, force_copy: bool) -> Option<Arc<IndexBuffer>> {
        let indices = self.indices.as_ref()?;
        let shared = Arc::strong_count(indices) > 1;
        if force_copy || (copy_when_shared && shared) {
            Some(Arc::new(indices.as_ref().clone()))
        } else {
            Some(Arc::clone(indices))
        }
    }
}
