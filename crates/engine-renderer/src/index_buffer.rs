//! Triangle-list index storage in 16- or 32-bit width.

use serde::{Deserialize, Serialize};

/// Index list of a triangle mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "data", rename_all = "lowercase")]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Pick the narrowest width able to address every value.
    pub fn from_u32(indices: Vec<u32>) -> Self {
        if indices.iter().all(|&i| i <= u16::MAX as u32) {
            IndexBuffer::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            IndexBuffer::U32(indices)
        }
    }

    /// `0..count`, used for un-indexed geometry.
    pub fn sequential(count: usize) -> Self {
        Self::from_u32((0..count as u32).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_32bit(&self) -> bool {
        matches!(self, IndexBuffer::U32(_))
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexBuffer::U16(v) => v.get(i).map(|&x| x as u32),
            IndexBuffer::U32(v) => v.get(i).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let (narrow, wide) = match self {
            IndexBuffer::U16(v) => (Some(v.iter().map(|&x| x as u32)), None),
            IndexBuffer::U32(v) => (None, Some(v.iter().copied())),
        };
        narrow.into_iter().flatten().chain(wide.into_iter().flatten())
    }

    pub fn to_u32_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    pub fn max_value(&self) -> Option<u32> {
        self.iter().max()
    }

    /// Switch to 32-bit storage, preserving content.
    pub fn widen(&mut self) {
        if let IndexBuffer::U16(v) = self {
            *self = IndexBuffer::U32(v.iter().map(|&x| x as u32).collect());
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        match self {
            IndexBuffer::U16(v) => v.reserve(additional),
            IndexBuffer::U32(v) => v.reserve(additional),
        }
    }

    /// Append values. The caller widens first when a value exceeds `u16::MAX`.
    pub fn extend(&mut self, values: impl IntoIterator<Item = u32>) {
        match self {
            IndexBuffer::U16(v) => v.extend(values.into_iter().map(|x| {
                debug_assert!(x <= u16::MAX as u32);
                x as u16
            })),
            IndexBuffer::U32(v) => v.extend(values),
        }
    }

    /// Reverse the winding of every triangle in `start..end` by swapping the
    /// second and third index of each face.
    pub fn flip_faces(&mut self, start: usize, end: usize) {
        fn flip<T>(faces: &mut [T]) {
            for face in faces.chunks_exact_mut(3) {
                face.swap(1, 2);
            }
        }
        match self {
            IndexBuffer::U16(v) => flip(&mut v[start..end]),
            IndexBuffer::U32(v) => flip(&mut v[start..end]),
        }
    }

    pub fn flip_all(&mut self) {
        let len = self.len();
        self.flip_faces(0, len);
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::U16(v) => bytemuck::cast_slice(v),
            IndexBuffer::U32(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            IndexBuffer::U16(_) => wgpu::IndexFormat::Uint16,
            IndexBuffer::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }
}

impl Default for IndexBuffer {
    fn default() -> Self {
        IndexBuffer::U16(Vec::new())
    }
}

impl From<Vec<u32>> for IndexBuffer {
    fn from(indices: Vec<u32>) -> Self {
        IndexBuffer::U32(indices)
    }
}

impl From<Vec<u16>> for IndexBuffer {
    fn from(indices: Vec<u16>) -> Self {
        IndexBuffer::U16(indices)
    }
}
