//! CPU ray casting against bounding boxes and triangle lists.

use engine_core::EntityId;
use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::index_buffer::IndexBuffer;
use crate::scene::SceneId;

/// Ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Move the ray into another space. The direction is renormalized, so
    /// distances along the result are in the target space.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        Self::new(
            matrix.transform_point3(self.origin),
            matrix.transform_vector3(self.direction),
        )
    }

    /// Slab test. Returns the entry distance, clamped to 0 when the origin is
    /// inside the box.
    pub fn intersect_aabb(&self, aabb: &AABB) -> Option<f32> {
        let inv = |d: f32| if d.abs() > f32::EPSILON { d.recip() } else { f32::MAX };
        let inv_dir = Vec3::new(inv(self.direction.x), inv(self.direction.y), inv(self.direction.z));

        let t1 = (aabb.min - self.origin) * inv_dir;
        let t2 = (aabb.max - self.origin) * inv_dir;
        let near = t1.min(t2).max_element();
        let far = t1.max(t2).min_element();

        (far >= near && far >= 0.0).then(|| near.max(0.0))
    }

    /// Möller–Trumbore intersection. Both windings are hit.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = det.recip();

        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }

    /// Nearest hit over a triangle list; un-indexed positions are read as
    /// sequential triangles.
    pub fn intersect_triangles(&self, positions: &[f32], indices: Option<&IndexBuffer>) -> Option<f32> {
        let vertex = |i: u32| {
            let start = i as usize * 3;
            positions.get(start..start + 3).map(Vec3::from_slice)
        };
        let faces: Vec<u32> = match indices {
            Some(indices) => indices.to_u32_vec(),
            None => (0..(positions.len() / 3) as u32).collect(),
        };

        faces
            .chunks_exact(3)
            .filter_map(|face| {
                let (a, b, c) = (vertex(face[0])?, vertex(face[1])?, vertex(face[2])?);
                self.intersect_triangle(a, b, c)
            })
            .min_by(f32::total_cmp)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of size `scale` centered at `center`.
    pub fn unit_cube(center: Vec3, scale: Vec3) -> Self {
        let half = scale * 0.5;
        Self::new(center - half, center + half)
    }

    /// Bounds of a flat `x, y, z, ...` array. `None` when empty.
    pub fn from_points(positions: &[f32]) -> Option<Self> {
        let mut points = positions.chunks_exact(3).map(Vec3::from_slice);
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| {
            Self::new(aabb.min.min(p), aabb.max.max(p))
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Result of a scene pick. A miss reports `distance == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickingInfo {
    pub hit: bool,
    pub distance: f32,
    #[serde(skip)]
    pub picked_mesh: Option<EntityId>,
    /// Scene whose world `picked_mesh` belongs to.
    pub picked_scene: Option<SceneId>,
    pub picked_point: Option<Vec3>,
    pub ray: Option<Ray>,
}

impl PickingInfo {
    pub fn miss(ray: Option<Ray>) -> Self {
        Self { ray, ..Self::default() }
    }

    pub fn hit(ray: Ray, distance: f32, mesh: EntityId) -> Self {
        Self {
            hit: true,
            distance,
            picked_mesh: Some(mesh),
            picked_scene: None,
            picked_point: Some(ray.at(distance)),
            ray: Some(ray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let aabb = AABB::unit_cube(Vec3::ZERO, Vec3::ONE);
        assert_relative_eq!(ray.intersect_aabb(&aabb).unwrap(), 4.5, epsilon = 1e-4);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::NEG_Z);
        assert!(ray.intersect_aabb(&AABB::unit_cube(Vec3::ZERO, Vec3::ONE)).is_none());
    }

    #[test]
    fn test_ray_inside_aabb() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(ray.intersect_aabb(&AABB::unit_cube(Vec3::ZERO, Vec3::ONE)), Some(0.0));
    }

    #[test]
    fn test_aabb_from_points() {
        let aabb = AABB::from_points(&[1.0, -2.0, 0.0, -1.0, 3.0, 0.5]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(aabb.contains(Vec3::ZERO));
        assert!(AABB::from_points(&[]).is_none());
    }

    #[test]
    fn test_ray_triangle() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 2.0), Vec3::NEG_Z);
        let hit = ray.intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert_relative_eq!(hit.unwrap(), 2.0);
        assert!(ray.intersect_triangle(Vec3::X, Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)).is_none());
    }

    #[test]
    fn test_ray_triangle_behind_origin() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 2.0), Vec3::Z);
        assert!(ray.intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn test_intersect_triangles_nearest() {
        let positions = [
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0,
        ];
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
        assert_relative_eq!(ray.intersect_triangles(&positions, None).unwrap(), 4.0);
    }

    #[test]
    fn test_ray_transform() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let local = ray.transform(&Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0)));
        assert_eq!(local.origin, Vec3::new(0.0, 0.0, 6.0));
        assert_eq!(local.direction, Vec3::NEG_Z);
    }

    #[test]
    fn test_picking_info_miss_has_zero_distance() {
        let info = PickingInfo::miss(None);
        assert!(!info.hit);
        assert_eq!(info.distance, 0.0);
    }
}
