//! CPU-side vertex attribute sets.
//!
//! [`VertexData`] is a plain aggregate of per-attribute float arrays plus an
//! optional triangle index list. It can be validated, transformed, merged with
//! other vertex data and finally bound to a [`GeometryOwner`].
//!
//! [`GeometryOwner`]: crate::geometry::GeometryOwner

mod apply;
mod merge;

use std::ops::Range;
use std::sync::Arc;

use engine_core::math::{Color4, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VertexDataError};
use crate::index_buffer::IndexBuffer;
use crate::vertex_kind::VertexKind;

pub use apply::{ApplyStep, ApplyTask};
pub use merge::MergeOptions;

/// Which faces of a generated surface are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SideOrientation {
    #[default]
    Front,
    Back,
    Double,
}

/// Sub-range of a vertex data drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialInfo {
    pub material_index: usize,
    pub vertices_start: usize,
    pub vertices_count: usize,
    pub index_start: usize,
    pub index_count: usize,
}

/// Per-vertex attribute arrays of a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VertexData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tangents: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs2: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs3: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs4: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs5: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs6: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_indices: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_weights: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_indices_extra: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_weights_extra: Option<Vec<f32>>,
    /// Triangle list. `None` means un-indexed (sequential) geometry.
    /// Shared between clones; mutated copy-on-write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<Arc<IndexBuffer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_infos: Option<Vec<MaterialInfo>>,
}

impl VertexData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions plus a 32-bit index list; the most common starting point.
    pub fn from_positions(positions: Vec<f32>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions: Some(positions),
            indices: indices.map(|i| Arc::new(IndexBuffer::U32(i))),
            ..Self::default()
        }
    }

    fn field(&self, kind: VertexKind) -> &Option<Vec<f32>> {
        match kind {
            VertexKind::Position => &self.positions,
            VertexKind::Normal => &self.normals,
            VertexKind::Tangent => &self.tangents,
            VertexKind::Uv => &self.uvs,
            VertexKind::Uv2 => &self.uvs2,
            VertexKind::Uv3 => &self.uvs3,
            VertexKind::Uv4 => &self.uvs4,
            VertexKind::Uv5 => &self.uvs5,
            VertexKind::Uv6 => &self.uvs6,
            VertexKind::Color => &self.colors,
            VertexKind::MatricesIndices => &self.matrices_indices,
            VertexKind::MatricesWeights => &self.matrices_weights,
            VertexKind::MatricesIndicesExtra => &self.matrices_indices_extra,
            VertexKind::MatricesWeightsExtra => &self.matrices_weights_extra,
        }
    }

    fn field_mut(&mut self, kind: VertexKind) -> &mut Option<Vec<f32>> {
        match kind {
            VertexKind::Position => &mut self.positions,
            VertexKind::Normal => &mut self.normals,
            VertexKind::Tangent => &mut self.tangents,
            VertexKind::Uv => &mut self.uvs,
            VertexKind::Uv2 => &mut self.uvs2,
            VertexKind::Uv3 => &mut self.uvs3,
            VertexKind::Uv4 => &mut self.uvs4,
            VertexKind::Uv5 => &mut self.uvs5,
            VertexKind::Uv6 => &mut self.uvs6,
            VertexKind::Color => &mut self.colors,
            VertexKind::MatricesIndices => &mut self.matrices_indices,
            VertexKind::MatricesWeights => &mut self.matrices_weights,
            VertexKind::MatricesIndicesExtra => &mut self.matrices_indices_extra,
            VertexKind::MatricesWeightsExtra => &mut self.matrices_weights_extra,
        }
    }

    /// Store `data` as the array of `kind`, replacing any previous array.
    pub fn set(&mut self, kind: VertexKind, data: Vec<f32>) -> &mut Self {
        *self.field_mut(kind) = Some(data);
        self
    }

    pub fn get(&self, kind: VertexKind) -> Option<&[f32]> {
        self.field(kind).as_deref()
    }

    pub fn take(&mut self, kind: VertexKind) -> Option<Vec<f32>> {
        self.field_mut(kind).take()
    }

    pub fn is_present(&self, kind: VertexKind) -> bool {
        self.field(kind).is_some()
    }

    /// Present kinds in bind order.
    pub fn kinds(&self) -> impl Iterator<Item = VertexKind> + '_ {
        VertexKind::ALL.into_iter().filter(|&kind| self.is_present(kind))
    }

    pub fn set_indices(&mut self, indices: impl Into<IndexBuffer>) -> &mut Self {
        self.indices = Some(Arc::new(indices.into()));
        self
    }

    pub fn set_colors(&mut self, colors: &[Color4]) -> &mut Self {
        self.set(VertexKind::Color, Color4::as_floats(colors).to_vec())
    }

    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.indices.as_deref()
    }

    /// Vertex count implied by the positions array.
    pub fn vertex_count(&self) -> usize {
        self.positions
            .as_ref()
            .map_or(0, |p| p.len() / VertexKind::Position.stride())
    }

    /// Number of indices this data contributes to a triangle list,
    /// counting un-indexed geometry as sequential.
    pub fn triangle_index_count(&self) -> usize {
        self.indices
            .as_ref()
            .map_or_else(|| self.vertex_count(), |i| i.len())
    }

    /// Check every present attribute against the positions count.
    ///
    /// Returns the vertex count on success.
    pub fn validate(&self) -> Result<usize> {
        let positions = self
            .positions
            .as_deref()
            .ok_or(VertexDataError::MissingPositions)?;
        let vertex_count = element_count(VertexKind::Position, positions)?;

        for kind in VertexKind::ALL.into_iter().skip(1) {
            let Some(data) = self.get(kind) else {
                continue;
            };
            let count = element_count(kind, data)?;
            if count != vertex_count {
                return Err(VertexDataError::CountMismatch {
                    kind,
                    count,
                    positions: vertex_count,
                });
            }
        }
        Ok(vertex_count)
    }

    /// Transform positions as points and normals/tangents as directions.
    ///
    /// A matrix with negative determinant mirrors handedness, so every
    /// face is flipped to keep the surface facing outward.
    pub fn transform(&mut self, matrix: &Mat4) -> &mut Self {
        for kind in [VertexKind::Position, VertexKind::Normal, VertexKind::Tangent] {
            if let Some(data) = self.field_mut(kind) {
                transform_in_place(kind, data, matrix);
            }
        }
        if matrix.determinant() < 0.0 {
            self.flip_winding();
        }
        self
    }

    /// Reverse the winding of every face, optionally negating the normals.
    pub fn flip_faces(&mut self, flip_normals: bool) -> &mut Self {
        if flip_normals {
            if let Some(normals) = &mut self.normals {
                normals.iter_mut().for_each(|n| *n = -*n);
            }
        }
        self.flip_winding();
        self
    }

    /// Reverse every face, through the indices when present, otherwise by
    /// reordering the sequential vertices.
    fn flip_winding(&mut self) {
        if let Some(indices) = self.indices.as_mut() {
            Arc::make_mut(indices).flip_all();
            return;
        }
        let vertex_count = self.vertex_count();
        self.flip_sequential_faces(0..vertex_count);
    }

    /// Swap the second and third vertex of each sequential face whose
    /// vertices lie in `vertices`, in every present attribute.
    fn flip_sequential_faces(&mut self, vertices: Range<usize>) {
        for kind in VertexKind::ALL {
            let stride = kind.stride();
            if let Some(data) = self.field_mut(kind) {
                let faces = &mut data[vertices.start * stride..vertices.end * stride];
                for face in faces.chunks_exact_mut(3 * stride) {
                    let (second, third) = face[stride..].split_at_mut(stride);
                    second.swap_with_slice(third);
                }
            }
        }
    }

    /// Adjust generated geometry for the requested side orientation.
    ///
    /// `Back` flips winding and normals. `Double` appends a mirrored copy of
    /// every vertex with negated normals and reversed winding.
    pub fn apply_side_orientation(&mut self, orientation: SideOrientation) -> &mut Self {
        match orientation {
            SideOrientation::Front => {}
            SideOrientation::Back => {
                self.flip_faces(true);
            }
            SideOrientation::Double => {
                let vertex_count = self.vertex_count() as u32;
                let front = self
                    .indices
                    .as_ref()
                    .map_or_else(|| (0..vertex_count).collect(), |i| i.to_u32_vec());

                for kind in VertexKind::ALL {
                    if let Some(data) = self.field_mut(kind) {
                        let len = data.len();
                        data.extend_from_within(..len);
                        if kind == VertexKind::Normal {
                            data[len..].iter_mut().for_each(|n| *n = -*n);
                        }
                    }
                }

                let back = front
                    .chunks_exact(3)
                    .flat_map(|f| [f[2] + vertex_count, f[1] + vertex_count, f[0] + vertex_count]);
                let mut indices = IndexBuffer::from_u32(front.iter().copied().chain(back).collect());
                if self.indices.as_ref().is_some_and(|i| i.is_32bit()) {
                    indices.widen();
                }
                self.indices = Some(Arc::new(indices));
            }
        }
        self
    }

    /// Area-weighted smooth normals for a triangle list.
    ///
    /// Un-indexed positions are treated as sequential triangles.
    pub fn compute_normals(positions: &[f32], indices: Option<&IndexBuffer>) -> Vec<f32> {
        let vertex = |i: u32| Vec3::from_slice(&positions[i as usize * 3..i as usize * 3 + 3]);
        let mut accumulated = vec![Vec3::ZERO; positions.len() / 3];

        let faces: Vec<u32> = indices.map_or_else(
            || (0..accumulated.len() as u32).collect(),
            IndexBuffer::to_u32_vec,
        );

        for face in faces.chunks_exact(3) {
            let (a, b, c) = (vertex(face[0]), vertex(face[1]), vertex(face[2]));
            let face_normal = (b - a).cross(c - a);
            for &i in face {
                accumulated[i as usize] += face_normal;
            }
        }

        accumulated
            .into_iter()
            .flat_map(|n| n.normalize_or_zero().to_array())
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate serialized vertex data.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: VertexData = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }
}

fn element_count(kind: VertexKind, data: &[f32]) -> Result<usize> {
    let stride = kind.stride();
    if data.len() % stride != 0 {
        return Err(VertexDataError::InvalidStride {
            kind,
            len: data.len(),
            stride,
        });
    }
    Ok(data.len() / stride)
}

/// Apply `matrix` to a flat attribute array of `kind`.
///
/// Positions use the affine point transform. Normals and tangent xyz use the
/// direction transform and are renormalized; tangent `w` is kept. Other kinds
/// are left untouched.
pub(crate) fn transform_in_place(kind: VertexKind, data: &mut [f32], matrix: &Mat4) {
    match kind {
        VertexKind::Position => {
            for p in data.chunks_exact_mut(3) {
                matrix
                    .transform_point3(Vec3::from_slice(p))
                    .write_to_slice(p);
            }
        }
        VertexKind::Normal | VertexKind::Tangent => {
            for v in data.chunks_exact_mut(kind.stride()) {
                matrix
                    .transform_vector3(Vec3::from_slice(&v[..3]))
                    .normalize_or_zero()
                    .write_to_slice(&mut v[..3]);
            }
        }
        _ => {}
    }
}
