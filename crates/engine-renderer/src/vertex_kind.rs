//! Closed set of per-vertex attribute kinds.

use serde::{Deserialize, Serialize};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// Attribute kind of a vertex buffer.
///
/// The declaration order is the bind order used when vertex data is applied to
/// a geometry owner; positions always come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VertexKind {
    Position,
    Normal,
    Tangent,
    Uv,
    Uv2,
    Uv3,
    Uv4,
    Uv5,
    Uv6,
    Color,
    MatricesIndices,
    MatricesWeights,
    MatricesIndicesExtra,
    MatricesWeightsExtra,
}

impl VertexKind {
    pub const ALL: [VertexKind; 14] = [
        VertexKind::Position,
        VertexKind::Normal,
        VertexKind::Tangent,
        VertexKind::Uv,
        VertexKind::Uv2,
        VertexKind::Uv3,
        VertexKind::Uv4,
        VertexKind::Uv5,
        VertexKind::Uv6,
        VertexKind::Color,
        VertexKind::MatricesIndices,
        VertexKind::MatricesWeights,
        VertexKind::MatricesIndicesExtra,
        VertexKind::MatricesWeightsExtra,
    ];

    /// UV channels in channel order.
    pub const UVS: [VertexKind; 6] = [
        VertexKind::Uv,
        VertexKind::Uv2,
        VertexKind::Uv3,
        VertexKind::Uv4,
        VertexKind::Uv5,
        VertexKind::Uv6,
    ];

    /// Number of floats per vertex.
    pub const fn stride(self) -> usize {
        match self {
            VertexKind::Position | VertexKind::Normal => 3,
            VertexKind::Uv
            | VertexKind::Uv2
            | VertexKind::Uv3
            | VertexKind::Uv4
            | VertexKind::Uv5
            | VertexKind::Uv6 => 2,
            VertexKind::Tangent
            | VertexKind::Color
            | VertexKind::MatricesIndices
            | VertexKind::MatricesWeights
            | VertexKind::MatricesIndicesExtra
            | VertexKind::MatricesWeightsExtra => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            VertexKind::Position => "position",
            VertexKind::Normal => "normal",
            VertexKind::Tangent => "tangent",
            VertexKind::Uv => "uv",
            VertexKind::Uv2 => "uv2",
            VertexKind::Uv3 => "uv3",
            VertexKind::Uv4 => "uv4",
            VertexKind::Uv5 => "uv5",
            VertexKind::Uv6 => "uv6",
            VertexKind::Color => "color",
            VertexKind::MatricesIndices => "matricesIndices",
            VertexKind::MatricesWeights => "matricesWeights",
            VertexKind::MatricesIndicesExtra => "matricesIndicesExtra",
            VertexKind::MatricesWeightsExtra => "matricesWeightsExtra",
        }
    }

    /// Kinds whose data is a direction and follows the normal-transform rule.
    pub const fn is_direction(self) -> bool {
        matches!(self, VertexKind::Normal | VertexKind::Tangent)
    }

    pub fn shader_location(self) -> u32 {
        self as u32
    }

    pub const fn format(self) -> VertexFormat {
        match self.stride() {
            2 => VertexFormat::Float32x2,
            3 => VertexFormat::Float32x3,
            _ => VertexFormat::Float32x4,
        }
    }

    /// Byte stride of a tightly packed buffer of this kind.
    pub const fn byte_stride(self) -> BufferAddress {
        (self.stride() * std::mem::size_of::<f32>()) as BufferAddress
    }

    /// Single-attribute (non-interleaved) buffer layout for this kind.
    pub fn buffer_layout(attribute: &VertexAttribute) -> VertexBufferLayout<'_> {
        VertexBufferLayout {
            array_stride: attribute.format.size(),
            step_mode: VertexStepMode::Vertex,
            attributes: std::slice::from_ref(attribute),
        }
    }

    pub fn attribute(self) -> VertexAttribute {
        VertexAttribute {
            offset: 0,
            shader_location: self.shader_location(),
            format: self.format(),
        }
    }
}

impl std::fmt::Display for VertexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for VertexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VertexKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown vertex kind '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(VertexKind::Position.stride(), 3);
        assert_eq!(VertexKind::Normal.stride(), 3);
        assert_eq!(VertexKind::Tangent.stride(), 4);
        assert_eq!(VertexKind::Uv4.stride(), 2);
        assert_eq!(VertexKind::Color.stride(), 4);
        assert_eq!(VertexKind::MatricesWeightsExtra.stride(), 4);
    }

    #[test]
    fn test_format_matches_stride() {
        for kind in VertexKind::ALL {
            assert_eq!(kind.format().size(), kind.byte_stride());
        }
    }

    #[test]
    fn test_shader_locations_are_unique() {
        let mut locations: Vec<u32> = VertexKind::ALL.iter().map(|k| k.shader_location()).collect();
        locations.dedup();
        assert_eq!(locations.len(), VertexKind::ALL.len());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("uv3".parse::<VertexKind>(), Ok(VertexKind::Uv3));
        assert_eq!("matricesIndicesExtra".parse::<VertexKind>(), Ok(VertexKind::MatricesIndicesExtra));
        assert!("bogus".parse::<VertexKind>().is_err());
    }

    #[test]
    fn test_buffer_layout() {
        let attribute = VertexKind::Uv.attribute();
        let layout = VertexKind::buffer_layout(&attribute);
        assert_eq!(layout.array_stride, 8);
        assert_eq!(layout.attributes.len(), 1);
    }
}
