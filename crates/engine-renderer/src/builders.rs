//! Procedural shapes built as [`VertexData`].
//!
//! Front faces wind counter-clockwise seen from outside, matching
//! `wgpu::FrontFace::Ccw`. Every builder honours a [`SideOrientation`].

use std::collections::HashMap;
use std::f32::consts::TAU;

use engine_core::math::{Color4, Vec3};
use serde::{Deserialize, Serialize};

use crate::vertex_data::{SideOrientation, VertexData};
use crate::vertex_kind::VertexKind;

/// Per-face colors in `+X, -X, +Y, -Y, +Z, -Z` order that make a box's
/// orientation readable at a glance.
pub const DEBUG_FACE_COLORS: [Color4; 6] = [
    Color4::new(1.0, 0.0, 0.0, 1.0),
    Color4::new(0.0, 1.0, 1.0, 1.0),
    Color4::new(0.0, 1.0, 0.0, 1.0),
    Color4::new(1.0, 0.0, 1.0, 1.0),
    Color4::new(0.0, 0.0, 1.0, 1.0),
    Color4::new(1.0, 1.0, 0.0, 1.0),
];

const FACE_NORMALS: [Vec3; 6] = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxOptions {
    pub size: f32,
    /// Overrides `size` along X.
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub depth: Option<f32>,
    /// One color per face, `+X, -X, +Y, -Y, +Z, -Z`.
    pub face_colors: Option<[Color4; 6]>,
    pub side_orientation: SideOrientation,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            size: 1.0,
            width: None,
            height: None,
            depth: None,
            face_colors: None,
            side_orientation: SideOrientation::Front,
        }
    }
}

pub fn create_box(options: &BoxOptions) -> VertexData {
    let scale = Vec3::new(
        options.width.unwrap_or(options.size),
        options.height.unwrap_or(options.size),
        options.depth.unwrap_or(options.size),
    ) * 0.5;

    let mut positions = Vec::with_capacity(6 * 4 * 3);
    let mut normals = Vec::with_capacity(6 * 4 * 3);
    let mut uvs = Vec::with_capacity(6 * 4 * 2);
    let mut indices = Vec::with_capacity(36);

    for normal in FACE_NORMALS {
        let side1 = Vec3::new(normal.y, normal.z, normal.x);
        let side2 = normal.cross(side1);
        let base = (positions.len() / 3) as u32;

        let corners = [
            (normal - side1 - side2, [0.0, 0.0]),
            (normal + side1 - side2, [1.0, 0.0]),
            (normal + side1 + side2, [1.0, 1.0]),
            (normal - side1 + side2, [0.0, 1.0]),
        ];
        for (corner, uv) in corners {
            positions.extend_from_slice(&(corner * scale).to_array());
            normals.extend_from_slice(&normal.to_array());
            uvs.extend_from_slice(&uv);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let mut data = VertexData::from_positions(positions, Some(indices));
    data.set(VertexKind::Normal, normals).set(VertexKind::Uv, uvs);
    if let Some(face_colors) = &options.face_colors {
        let colors: Vec<Color4> = face_colors.iter().flat_map(|&c| [c; 4]).collect();
        data.set_colors(&colors);
    }
    data.apply_side_orientation(options.side_orientation);
    data
}

/// Subdivided plane on XZ facing +Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroundOptions {
    pub width: f32,
    pub height: f32,
    pub subdivisions_x: u32,
    pub subdivisions_y: u32,
    pub side_orientation: SideOrientation,
}

impl Default for GroundOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            subdivisions_x: 1,
            subdivisions_y: 1,
            side_orientation: SideOrientation::Front,
        }
    }
}

pub fn create_ground(options: &GroundOptions) -> VertexData {
    let columns = options.subdivisions_x.max(1);
    let rows = options.subdivisions_y.max(1);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    for row in 0..=rows {
        let v = row as f32 / rows as f32;
        for column in 0..=columns {
            let u = column as f32 / columns as f32;
            positions.extend_from_slice(&[(u - 0.5) * options.width, 0.0, (v - 0.5) * options.height]);
            normals.extend_from_slice(&[0.0, 1.0, 0.0]);
            uvs.extend_from_slice(&[u, 1.0 - v]);
        }
    }

    let stride = columns + 1;
    let mut indices = Vec::with_capacity((rows * columns * 6) as usize);
    for row in 0..rows {
        for column in 0..columns {
            let a = row * stride + column;
            let (b, c, d) = (a + stride, a + 1, a + stride + 1);
            indices.extend_from_slice(&[a, b, c, c, b, d]);
        }
    }

    let mut data = VertexData::from_positions(positions, Some(indices));
    data.set(VertexKind::Normal, normals).set(VertexKind::Uv, uvs);
    data.apply_side_orientation(options.side_orientation);
    data
}

/// Cylinder along Y, centered at the origin. A zero top diameter gives a cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CylinderOptions {
    pub height: f32,
    pub diameter_top: f32,
    pub diameter_bottom: f32,
    pub tessellation: u32,
    pub subdivisions: u32,
    pub cap: bool,
    pub side_orientation: SideOrientation,
}

impl Default for CylinderOptions {
    fn default() -> Self {
        Self {
            height: 2.0,
            diameter_top: 1.0,
            diameter_bottom: 1.0,
            tessellation: 24,
            subdivisions: 1,
            cap: true,
            side_orientation: SideOrientation::Front,
        }
    }
}

pub fn create_cylinder(options: &CylinderOptions) -> VertexData {
    let tessellation = options.tessellation.max(3);
    let subdivisions = options.subdivisions.max(1);
    let (radius_top, radius_bottom) = (options.diameter_top * 0.5, options.diameter_bottom * 0.5);
    let half = options.height * 0.5;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=subdivisions {
        let h = ring as f32 / subdivisions as f32;
        let y = -half + h * options.height;
        let radius = radius_bottom + (radius_top - radius_bottom) * h;
        for segment in 0..=tessellation {
            let u = segment as f32 / tessellation as f32;
            let (sin, cos) = (u * TAU).sin_cos();
            positions.extend_from_slice(&[radius * cos, y, radius * sin]);
            let normal = Vec3::new(cos * options.height, radius_bottom - radius_top, sin * options.height)
                .normalize_or_zero();
            normals.extend_from_slice(&normal.to_array());
            uvs.extend_from_slice(&[u, h]);
        }
    }

    let stride = tessellation + 1;
    for ring in 0..subdivisions {
        for segment in 0..tessellation {
            let a = ring * stride + segment;
            let (b, c, d) = (a + stride, a + 1, a + stride + 1);
            indices.extend_from_slice(&[a, b, c, c, b, d]);
        }
    }

    if options.cap {
        for (y, radius, up) in [(half, radius_top, true), (-half, radius_bottom, false)] {
            if radius <= 0.0 {
                continue;
            }
            let normal_y = if up { 1.0 } else { -1.0 };
            let center = (positions.len() / 3) as u32;
            positions.extend_from_slice(&[0.0, y, 0.0]);
            normals.extend_from_slice(&[0.0, normal_y, 0.0]);
            uvs.extend_from_slice(&[0.5, 0.5]);

            for segment in 0..=tessellation {
                let (sin, cos) = (segment as f32 / tessellation as f32 * TAU).sin_cos();
                positions.extend_from_slice(&[radius * cos, y, radius * sin]);
                normals.extend_from_slice(&[0.0, normal_y, 0.0]);
                uvs.extend_from_slice(&[0.5 + cos * 0.5, 0.5 + sin * 0.5]);
            }
            for segment in 0..tessellation {
                let (p, q) = (center + 1 + segment, center + 2 + segment);
                if up {
                    indices.extend_from_slice(&[center, q, p]);
                } else {
                    indices.extend_from_slice(&[center, p, q]);
                }
            }
        }
    }

    let mut data = VertexData::from_positions(positions, Some(indices));
    data.set(VertexKind::Normal, normals).set(VertexKind::Uv, uvs);
    data.apply_side_orientation(options.side_orientation);
    data
}

/// Sphere from a recursively subdivided icosahedron.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IcoSphereOptions {
    pub radius: f32,
    /// Midpoint subdivision passes; each one quadruples the face count.
    pub subdivisions: u32,
    /// Per-face normals instead of smooth ones.
    pub flat: bool,
    pub side_orientation: SideOrientation,
}

impl Default for IcoSphereOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            subdivisions: 2,
            flat: false,
            side_orientation: SideOrientation::Front,
        }
    }
}

const GOLDEN: f32 = 1.618_034;

const ICOSAHEDRON_VERTICES: [[f32; 3]; 12] = [
    [-1.0, GOLDEN, 0.0],
    [1.0, GOLDEN, 0.0],
    [-1.0, -GOLDEN, 0.0],
    [1.0, -GOLDEN, 0.0],
    [0.0, -1.0, GOLDEN],
    [0.0, 1.0, GOLDEN],
    [0.0, -1.0, -GOLDEN],
    [0.0, 1.0, -GOLDEN],
    [GOLDEN, 0.0, -1.0],
    [GOLDEN, 0.0, 1.0],
    [-GOLDEN, 0.0, -1.0],
    [-GOLDEN, 0.0, 1.0],
];

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

pub fn create_ico_sphere(options: &IcoSphereOptions) -> VertexData {
    let mut points: Vec<Vec3> = ICOSAHEDRON_VERTICES
        .iter()
        .map(|v| Vec3::from_array(*v).normalize())
        .collect();
    let mut faces: Vec<[u32; 3]> = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..options.subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, points: &mut Vec<Vec3>| {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                points.push(((points[a as usize] + points[b as usize]) * 0.5).normalize());
                (points.len() - 1) as u32
            })
        };

        faces = faces
            .iter()
            .flat_map(|&[a, b, c]| {
                let ab = midpoint(a, b, &mut points);
                let bc = midpoint(b, c, &mut points);
                let ca = midpoint(c, a, &mut points);
                [[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]
            })
            .collect();
    }

    let mut data = if options.flat {
        flat_shaded(&points, &faces, options.radius)
    } else {
        let positions = points.iter().flat_map(|p| (*p * options.radius).to_array()).collect();
        let normals = points.iter().flat_map(|p| p.to_array()).collect();
        let uvs = points.iter().flat_map(|&p| spherical_uv(p)).collect();
        let mut data = VertexData::from_positions(positions, Some(faces.concat()));
        data.set(VertexKind::Normal, normals).set(VertexKind::Uv, uvs);
        data
    };
    data.apply_side_orientation(options.side_orientation);
    data
}

fn spherical_uv(p: Vec3) -> [f32; 2] {
    [0.5 + p.z.atan2(p.x) / TAU, 0.5 - p.y.asin() / std::f32::consts::PI]
}

/// Un-shared vertices with one normal per face.
fn flat_shaded(points: &[Vec3], faces: &[[u32; 3]], scale: f32) -> VertexData {
    let mut positions = Vec::with_capacity(faces.len() * 9);
    let mut normals = Vec::with_capacity(faces.len() * 9);
    let mut uvs = Vec::with_capacity(faces.len() * 6);

    for face in faces {
        let [a, b, c] = face.map(|i| points[i as usize]);
        let normal = (b - a).cross(c - a).normalize_or_zero();
        for p in [a, b, c] {
            positions.extend_from_slice(&(p * scale).to_array());
            normals.extend_from_slice(&normal.to_array());
        }
        uvs.extend_from_slice(&[0.0, 0.0, 1.0, 0.0, 0.5, 1.0]);
    }

    let count = (positions.len() / 3) as u32;
    let mut data = VertexData::from_positions(positions, Some((0..count).collect()));
    data.set(VertexKind::Normal, normals).set(VertexKind::Uv, uvs);
    data
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolyhedronType {
    #[default]
    Tetrahedron,
    Octahedron,
    Icosahedron,
}

/// Flat-shaded regular polyhedron with circumradius `size / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolyhedronOptions {
    pub kind: PolyhedronType,
    pub size: f32,
    pub side_orientation: SideOrientation,
}

impl Default for PolyhedronOptions {
    fn default() -> Self {
        Self {
            kind: PolyhedronType::Tetrahedron,
            size: 1.0,
            side_orientation: SideOrientation::Front,
        }
    }
}

pub fn create_polyhedron(options: &PolyhedronOptions) -> VertexData {
    let (vertices, faces): (Vec<[f32; 3]>, Vec<[u32; 3]>) = match options.kind {
        PolyhedronType::Tetrahedron => (
            vec![[1.0, 1.0, 1.0], [1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, 1.0]],
            vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]],
        ),
        PolyhedronType::Octahedron => (
            vec![
                [1.0, 0.0, 0.0],
                [-1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, -1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, -1.0],
            ],
            vec![
                [0, 2, 4],
                [2, 1, 4],
                [1, 3, 4],
                [3, 0, 4],
                [2, 0, 5],
                [1, 2, 5],
                [3, 1, 5],
                [0, 3, 5],
            ],
        ),
        PolyhedronType::Icosahedron => (ICOSAHEDRON_VERTICES.to_vec(), ICOSAHEDRON_FACES.to_vec()),
    };

    let points: Vec<Vec3> = vertices.iter().map(|v| Vec3::from_array(*v).normalize()).collect();
    // Faces of a convex solid around the origin point away from it.
    let faces: Vec<[u32; 3]> = faces
        .into_iter()
        .map(|[a, b, c]| {
            let (pa, pb, pc) = (points[a as usize], points[b as usize], points[c as usize]);
            if (pb - pa).cross(pc - pa).dot(pa + pb + pc) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect();

    let mut data = flat_shaded(&points, &faces, options.size * 0.5);
    data.apply_side_orientation(options.side_orientation);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(data: &VertexData, index: u32) -> Vec3 {
        Vec3::from_slice(&data.positions.as_ref().unwrap()[index as usize * 3..])
    }

    /// Every triangle winds counter-clockwise seen from `outside(centroid)`.
    fn assert_faces_point(data: &VertexData, outside: impl Fn(Vec3) -> Vec3) {
        let indices = data.index_buffer().unwrap().to_u32_vec();
        for face in indices.chunks_exact(3) {
            let (a, b, c) = (vertex(data, face[0]), vertex(data, face[1]), vertex(data, face[2]));
            let normal = (b - a).cross(c - a);
            if normal.length_squared() < 1e-12 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(outside(centroid)) > 0.0, "face {face:?} points inward");
        }
    }

    #[test]
    fn test_box_layout() {
        let data = create_box(&BoxOptions {
            face_colors: Some(DEBUG_FACE_COLORS),
            ..Default::default()
        });
        assert_eq!(data.validate().unwrap(), 24);
        assert_eq!(data.index_buffer().unwrap().len(), 36);
        assert_eq!(&data.colors.as_ref().unwrap()[..4], &[1.0, 0.0, 0.0, 1.0]);
        assert_faces_point(&data, |c| c);
    }

    #[test]
    fn test_box_normals_match_winding() {
        let data = create_box(&BoxOptions::default());
        let normals = data.normals.as_ref().unwrap();
        let indices = data.index_buffer().unwrap().to_u32_vec();
        for face in indices.chunks_exact(3) {
            let (a, b, c) = (vertex(&data, face[0]), vertex(&data, face[1]), vertex(&data, face[2]));
            let stored = Vec3::from_slice(&normals[face[0] as usize * 3..]);
            assert!((b - a).cross(c - a).normalize().dot(stored) > 0.99);
        }
    }

    #[test]
    fn test_box_dimensions() {
        let data = create_box(&BoxOptions { size: 2.0, height: Some(4.0), ..Default::default() });
        let bounds = crate::picking::AABB::from_points(data.positions.as_ref().unwrap()).unwrap();
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_ground_faces_up() {
        let data = create_ground(&GroundOptions {
            width: 4.0,
            height: 2.0,
            subdivisions_x: 4,
            subdivisions_y: 2,
            ..Default::default()
        });
        assert_eq!(data.validate().unwrap(), 15);
        assert_eq!(data.index_buffer().unwrap().len(), 4 * 2 * 6);
        assert_faces_point(&data, |_| Vec3::Y);
    }

    #[test]
    fn test_cylinder_faces_outward() {
        let data = create_cylinder(&CylinderOptions::default());
        data.validate().unwrap();
        assert_faces_point(&data, |c| {
            if c.y.abs() > 0.999 { Vec3::new(0.0, c.y, 0.0) } else { Vec3::new(c.x, 0.0, c.z) }
        });
    }

    #[test]
    fn test_cone_skips_top_cap() {
        let cylinder = create_cylinder(&CylinderOptions { tessellation: 8, ..Default::default() });
        let cone = create_cylinder(&CylinderOptions { tessellation: 8, diameter_top: 0.0, ..Default::default() });
        assert_eq!(cylinder.vertex_count() - cone.vertex_count(), 10);

        let normals = cone.normals.as_ref().unwrap();
        assert!(normals[1] > 0.0, "cone side normals tilt toward the tip");
    }

    #[test]
    fn test_ico_sphere() {
        let data = create_ico_sphere(&IcoSphereOptions { radius: 2.0, subdivisions: 1, ..Default::default() });
        assert_eq!(data.validate().unwrap(), 42);
        assert_eq!(data.index_buffer().unwrap().len(), 80 * 3);
        for p in data.positions.as_ref().unwrap().chunks_exact(3) {
            assert!((Vec3::from_slice(p).length() - 2.0).abs() < 1e-4);
        }
        assert_faces_point(&data, |c| c);
    }

    #[test]
    fn test_flat_ico_sphere_unshares_vertices() {
        let data = create_ico_sphere(&IcoSphereOptions { subdivisions: 0, flat: true, ..Default::default() });
        assert_eq!(data.validate().unwrap(), 60);
        assert_faces_point(&data, |c| c);
    }

    #[test]
    fn test_polyhedra_face_outward() {
        for (kind, faces) in [
            (PolyhedronType::Tetrahedron, 4),
            (PolyhedronType::Octahedron, 8),
            (PolyhedronType::Icosahedron, 20),
        ] {
            let data = create_polyhedron(&PolyhedronOptions { kind, ..Default::default() });
            assert_eq!(data.validate().unwrap(), faces * 3);
            assert_faces_point(&data, |c| c);
        }
    }

    #[test]
    fn test_double_sided_ground() {
        let data = create_ground(&GroundOptions {
            side_orientation: SideOrientation::Double,
            ..Default::default()
        });
        assert_eq!(data.vertex_count(), 8);
        assert_eq!(data.index_buffer().unwrap().len(), 12);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: CylinderOptions = serde_json::from_str(r#"{"diameterTop":0.0}"#).unwrap();
        assert_eq!(options.diameter_top, 0.0);
        assert_eq!(options.tessellation, 24);
    }
}
