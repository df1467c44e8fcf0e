use std::sync::Arc;

use engine_core::math::Mat4;

use super::{MaterialInfo, VertexData, transform_in_place};
use crate::error::{Result, VertexDataError};
use crate::index_buffer::IndexBuffer;
use crate::vertex_kind::VertexKind;

/// Options for [`VertexData::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Always produce a 32-bit index buffer.
    pub use_32bit_indices: bool,
    /// Always copy the receiver's index buffer instead of reusing it.
    pub force_clone_indices: bool,
    /// Record one material range per merged participant.
    pub merge_material_ids: bool,
}

impl VertexData {
    /// Append `others` to this vertex data.
    ///
    /// Every participant must validate and carry the same set of attributes.
    /// Nothing is modified when an error is returned.
    pub fn merge(&mut self, others: &[&VertexData], options: MergeOptions) -> Result<&mut Self> {
        let others: Vec<(&VertexData, Option<Mat4>)> =
            others.iter().map(|&other| (other, None)).collect();
        self.merge_transformed(None, &others, options)
    }

    /// Like [`VertexData::merge`], with a world transform per participant.
    ///
    /// `transform` applies to the receiver's own data, the paired matrices to
    /// each operand as it is appended. Mirroring transforms flip the winding
    /// of the faces they apply to.
    pub fn merge_transformed(
        &mut self,
        transform: Option<Mat4>,
        others: &[(&VertexData, Option<Mat4>)],
        options: MergeOptions,
    ) -> Result<&mut Self> {
        self.validate()?;
        for (other, _) in others {
            other.validate()?;
            self.check_same_attributes(other)?;
        }

        let indexed = self.indices.is_some() || others.iter().any(|(o, _)| o.indices.is_some());
        let own_vertices = self.vertex_count();

        if options.merge_material_ids {
            self.material_infos = Some(self.merged_material_infos(others, indexed));
        }
        if indexed {
            self.indices = Some(Arc::new(self.merged_indices(transform, others, options)));
        }

        for kind in VertexKind::ALL {
            let Some(own) = self.field_mut(kind).as_mut() else {
                continue;
            };
            if let Some(matrix) = &transform {
                transform_in_place(kind, own, matrix);
            }

            own.reserve(others.iter().map(|(o, _)| o.get(kind).map_or(0, <[f32]>::len)).sum());
            for (other, other_transform) in others {
                let Some(data) = other.get(kind) else {
                    continue;
                };
                match other_transform {
                    Some(matrix) if kind == VertexKind::Position || kind.is_direction() => {
                        let start = own.len();
                        own.extend(data.iter().copied());
                        transform_in_place(kind, &mut own[start..], matrix);
                    }
                    _ => own.extend_from_slice(data),
                }
            }
        }

        if !indexed {
            let mirrored = |matrix: &Option<Mat4>| matches!(matrix, Some(m) if m.determinant() < 0.0);
            if mirrored(&transform) {
                self.flip_sequential_faces(0..own_vertices);
            }
            let mut offset = own_vertices;
            for (other, other_transform) in others {
                let count = other.vertex_count();
                if mirrored(other_transform) {
                    self.flip_sequential_faces(offset..offset + count);
                }
                offset += count;
            }
        }

        log::debug!(
            "merged {} vertex data into {} vertices ({} indices)",
            others.len() + 1,
            self.vertex_count(),
            self.indices.as_ref().map_or(0, |i| i.len())
        );
        Ok(self)
    }

    fn check_same_attributes(&self, other: &VertexData) -> Result<()> {
        match VertexKind::ALL
            .into_iter()
            .skip(1)
            .find(|&kind| self.is_present(kind) != other.is_present(kind))
        {
            Some(kind) => {
                log::warn!("merge rejected: {kind} presence differs");
                Err(VertexDataError::AttributeMismatch { kind })
            }
            None => Ok(()),
        }
    }

    /// Build the concatenated index list. Operand indices are rebased by the
    /// running vertex total; un-indexed participants contribute sequential
    /// indices.
    fn merged_indices(
        &mut self,
        transform: Option<Mat4>,
        others: &[(&VertexData, Option<Mat4>)],
        options: MergeOptions,
    ) -> IndexBuffer {
        let own_vertices = self.vertex_count();
        let aliased = self.indices.as_ref().is_some_and(|own| {
            others
                .iter()
                .any(|(o, _)| o.indices.as_ref().is_some_and(|theirs| Arc::ptr_eq(own, theirs)))
        });

        let mut indices = match self.indices.take() {
            Some(own) if aliased || options.force_clone_indices => IndexBuffer::clone(&own),
            Some(own) => Arc::unwrap_or_clone(own),
            None => IndexBuffer::sequential(own_vertices),
        };
        let own_len = indices.len();

        let mut offset = own_vertices;
        let mut max_value = indices.max_value().unwrap_or(0);
        for (other, _) in others {
            let local_max = match other.index_buffer() {
                Some(i) => i.max_value(),
                None => other.vertex_count().checked_sub(1).map(|m| m as u32),
            };
            if let Some(local_max) = local_max {
                max_value = max_value.max(offset as u32 + local_max);
            }
            offset += other.vertex_count();
        }
        let any_wide = others
            .iter()
            .any(|(o, _)| o.index_buffer().is_some_and(IndexBuffer::is_32bit));
        if options.use_32bit_indices || any_wide || max_value > u16::MAX as u32 {
            indices.widen();
        }

        indices.reserve(others.iter().map(|(o, _)| o.triangle_index_count()).sum());
        if transform.is_some_and(|m| m.determinant() < 0.0) {
            indices.flip_faces(0, own_len);
        }

        let mut offset = own_vertices as u32;
        for (other, other_transform) in others {
            let start = indices.len();
            match other.index_buffer() {
                Some(theirs) => indices.extend(theirs.iter().map(|i| i + offset)),
                None => indices.extend((0..other.vertex_count() as u32).map(|i| i + offset)),
            }
            if other_transform.is_some_and(|m| m.determinant() < 0.0) {
                let end = indices.len();
                indices.flip_faces(start, end);
            }
            offset += other.vertex_count() as u32;
        }
        indices
    }

    fn merged_material_infos(
        &self,
        others: &[(&VertexData, Option<Mat4>)],
        indexed: bool,
    ) -> Vec<MaterialInfo> {
        let participants = std::iter::once(self).chain(others.iter().map(|(o, _)| *o));
        let mut infos = Vec::new();
        let (mut vertices_start, mut index_start) = (0, 0);

        for (position, data) in participants.enumerate() {
            let index_count = if indexed { data.triangle_index_count() } else { 0 };
            match data.material_infos.as_deref() {
                Some(existing) if !existing.is_empty() => {
                    infos.extend(existing.iter().map(|info| MaterialInfo {
                        vertices_start: info.vertices_start + vertices_start,
                        index_start: info.index_start + index_start,
                        ..*info
                    }));
                }
                _ => infos.push(MaterialInfo {
                    material_index: position,
                    vertices_start,
                    vertices_count: data.vertex_count(),
                    index_start,
                    index_count,
                }),
            }
            vertices_start += data.vertex_count();
            index_start += index_count;
        }
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use engine_core::math::Vec3;

    fn quad(z: f32) -> VertexData {
        let mut data = VertexData::from_positions(
            vec![0.0, 0.0, z, 1.0, 0.0, z, 1.0, 1.0, z, 0.0, 1.0, z],
            Some(vec![0, 1, 2, 0, 2, 3]),
        );
        data.set(VertexKind::Normal, [0.0, 0.0, 1.0].repeat(4));
        data
    }

    fn vertex(data: &VertexData, index: u32) -> [f32; 3] {
        let p = data.positions.as_ref().unwrap();
        let i = index as usize * 3;
        [p[i], p[i + 1], p[i + 2]]
    }

    #[test]
    fn test_merge_with_nothing_is_identity() {
        let mut data = quad(0.0);
        let original = data.clone();
        data.merge(&[], MergeOptions::default()).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn test_merge_rebases_indices() {
        let mut a = quad(0.0);
        let b = quad(5.0);
        let c = quad(9.0);
        a.merge(&[&b, &c], MergeOptions::default()).unwrap();

        assert_eq!(a.vertex_count(), 12);
        assert_eq!(a.validate().unwrap(), 12);
        let indices = a.index_buffer().unwrap().to_u32_vec();
        assert_eq!(indices.len(), 18);
        assert_eq!(&indices[6..12], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(&indices[12..], &[8, 9, 10, 8, 10, 11]);

        for &i in &indices[6..12] {
            assert_eq!(vertex(&a, i)[2], 5.0);
        }
        for &i in &indices[12..] {
            assert_eq!(vertex(&a, i)[2], 9.0);
        }
    }

    #[test]
    fn test_merge_attribute_mismatch_leaves_receiver_untouched() {
        let mut with_normals = quad(0.0);
        let mut without_normals = quad(1.0);
        without_normals.take(VertexKind::Normal);
        let before = with_normals.clone();

        let err = with_normals
            .merge(&[&without_normals], MergeOptions::default())
            .unwrap_err();
        assert!(matches!(err, VertexDataError::AttributeMismatch { kind: VertexKind::Normal }));
        assert_eq!(with_normals, before);
    }

    #[test]
    fn test_merge_invalid_operand_fails_first() {
        let mut a = quad(0.0);
        let mut b = quad(1.0);
        b.set(VertexKind::Normal, vec![0.0; 5]);
        assert!(matches!(
            a.merge(&[&b], MergeOptions::default()),
            Err(VertexDataError::InvalidStride { .. })
        ));
        assert_eq!(a.vertex_count(), 4);
    }

    #[test]
    fn test_merge_aliased_indices_are_cloned() {
        let mut a = quad(0.0);
        let b = a.clone();
        let shared = Arc::clone(a.indices.as_ref().unwrap());

        a.merge(&[&b], MergeOptions::default()).unwrap();

        assert!(!Arc::ptr_eq(a.indices.as_ref().unwrap(), &shared));
        assert_eq!(shared.len(), 6);
        assert_eq!(b.index_buffer().unwrap().len(), 6);
        assert_eq!(a.index_buffer().unwrap().len(), 12);
    }

    #[test]
    fn test_merge_widens_when_requested() {
        let mut a = quad(0.0);
        a.set_indices(vec![0u16, 1, 2, 0, 2, 3]);
        let mut b = quad(1.0);
        b.set_indices(vec![0u16, 1, 2, 0, 2, 3]);

        a.merge(&[&b], MergeOptions::default()).unwrap();
        assert!(!a.index_buffer().unwrap().is_32bit());

        a.merge(&[&b], MergeOptions { use_32bit_indices: true, ..Default::default() })
            .unwrap();
        assert!(a.index_buffer().unwrap().is_32bit());
        assert_eq!(a.index_buffer().unwrap().get(12), Some(8));
    }

    #[test]
    fn test_merge_widens_for_wide_operand() {
        let mut a = quad(0.0);
        a.set_indices(vec![0u16, 1, 2, 0, 2, 3]);
        let b = quad(1.0);
        a.merge(&[&b], MergeOptions::default()).unwrap();
        assert!(a.index_buffer().unwrap().is_32bit());
    }

    #[test]
    fn test_merge_widens_when_values_overflow() {
        let big = VertexData::from_positions(vec![0.0; 3 * 70_000], None);
        let mut a = VertexData::from_positions(vec![0.0; 9], None);
        a.set_indices(vec![0u16, 1, 2]);
        a.merge(&[&big], MergeOptions::default()).unwrap();

        let indices = a.index_buffer().unwrap();
        assert!(indices.is_32bit());
        assert_eq!(indices.len(), 3 + 70_000);
        assert_eq!(indices.get(indices.len() - 1), Some(3 + 69_999));
    }

    #[test]
    fn test_merge_unindexed_stays_unindexed() {
        let mut a = VertexData::from_positions(vec![0.0; 9], None);
        let b = VertexData::from_positions(vec![1.0; 9], None);
        a.merge(&[&b], MergeOptions::default()).unwrap();
        assert!(a.indices.is_none());
        assert_eq!(a.vertex_count(), 6);
    }

    #[test]
    fn test_merge_unindexed_mirror_flips_only_mirrored_faces() {
        let triangle = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut a = VertexData::from_positions(triangle.clone(), None);
        let b = VertexData::from_positions(triangle, None);
        let mirror = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));

        a.merge_transformed(None, &[(&b, Some(mirror))], MergeOptions::default())
            .unwrap();
        assert!(a.indices.is_none());

        let normals = VertexData::compute_normals(a.get(VertexKind::Position).unwrap(), None);
        assert_relative_eq!(normals[2], 1.0);
        assert_relative_eq!(normals[9 + 2], 1.0);
        assert_eq!(vertex(&a, 4), [0.0, 1.0, 0.0]);
        assert_eq!(vertex(&a, 5), [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_merge_unindexed_base_mirror_flips_receiver() {
        let mut a = VertexData::from_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], None);
        let b = VertexData::from_positions(vec![0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0], None);
        let mirror = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0));

        a.merge_transformed(Some(mirror), &[(&b, None)], MergeOptions::default())
            .unwrap();
        assert_eq!(vertex(&a, 1), [0.0, -1.0, 0.0]);
        assert_eq!(vertex(&a, 2), [1.0, 0.0, 0.0]);
        assert_eq!(vertex(&a, 4), [1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_merge_mixed_indexing_generates_sequential() {
        let mut a = VertexData::from_positions(vec![0.0; 9], None);
        let b = VertexData::from_positions(vec![1.0; 9], Some(vec![2, 1, 0]));
        a.merge(&[&b], MergeOptions::default()).unwrap();
        assert_eq!(a.index_buffer().unwrap().to_u32_vec(), vec![0, 1, 2, 5, 4, 3]);
    }

    #[test]
    fn test_merge_transformed_applies_and_flips() {
        let mut a = quad(0.0);
        let b = quad(0.0);
        let mirror = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));
        let shift = Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0));

        a.merge_transformed(None, &[(&b, Some(mirror)), (&b, Some(shift))], MergeOptions::default())
            .unwrap();

        let indices = a.index_buffer().unwrap().to_u32_vec();
        assert_eq!(&indices[..6], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(&indices[6..12], &[4, 6, 5, 4, 7, 6]);
        assert_eq!(&indices[12..], &[8, 9, 10, 8, 10, 11]);

        assert_eq!(vertex(&a, 5), [-1.0, 0.0, 0.0]);
        assert_eq!(vertex(&a, 9), [1.0, 0.0, 3.0]);
        let normals = a.normals.as_ref().unwrap();
        assert_relative_eq!(normals[4 * 3 + 2], 1.0);
    }

    #[test]
    fn test_merge_transformed_base_mirror_flips_receiver() {
        let mut a = quad(0.0);
        let b = quad(1.0);
        let mirror = Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0));
        a.merge_transformed(Some(mirror), &[(&b, None)], MergeOptions::default())
            .unwrap();

        let indices = a.index_buffer().unwrap().to_u32_vec();
        assert_eq!(&indices[..6], &[0, 2, 1, 0, 3, 2]);
        assert_eq!(&indices[6..], &[4, 5, 6, 4, 6, 7]);
        assert_relative_eq!(a.normals.as_ref().unwrap()[2], -1.0);
        assert_eq!(vertex(&a, 4), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_merge_material_ids() {
        let mut a = quad(0.0);
        let b = quad(1.0);
        let mut c = quad(2.0);
        c.material_infos = Some(vec![
            MaterialInfo { material_index: 7, vertices_start: 0, vertices_count: 2, index_start: 0, index_count: 3 },
            MaterialInfo { material_index: 8, vertices_start: 2, vertices_count: 2, index_start: 3, index_count: 3 },
        ]);

        a.merge(&[&b, &c], MergeOptions { merge_material_ids: true, ..Default::default() })
            .unwrap();

        let infos = a.material_infos.as_ref().unwrap();
        assert_eq!(infos.len(), 4);
        assert_eq!(infos[1], MaterialInfo {
            material_index: 1,
            vertices_start: 4,
            vertices_count: 4,
            index_start: 6,
            index_count: 6,
        });
        assert_eq!(infos[3].material_index, 8);
        assert_eq!(infos[3].vertices_start, 10);
        assert_eq!(infos[3].index_start, 15);
    }
}
