//! Math types shared by every engine crate.
//!
//! Vector, matrix and quaternion types are re-exported from `glam` so that all
//! crates agree on one version. Colors are small `#[repr(C)]` value types that
//! can be reinterpreted as flat float slices for vertex buffers.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// RGB color with components in `[0, 1]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    pub const RED: Self = Self::new(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn with_alpha(self, a: f32) -> Color4 {
        Color4::new(self.r, self.g, self.b, a)
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Parse `#RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<[f32; 3]> for Color3 {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// RGBA color with components in `[0, 1]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn rgb(self) -> Color3 {
        Color3::new(self.r, self.g, self.b)
    }

    /// View a color list as the flat `r, g, b, a, ...` layout vertex buffers use.
    pub fn as_floats(colors: &[Color4]) -> &[f32] {
        bytemuck::cast_slice(colors)
    }
}

impl Default for Color4 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color4 {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<Color3> for Color4 {
    fn from(color: Color3) -> Self {
        color.with_alpha(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_as_floats() {
        let colors = [Color4::new(1.0, 0.0, 0.0, 1.0), Color4::new(0.0, 0.5, 0.0, 0.25)];
        assert_eq!(
            Color4::as_floats(&colors),
            &[1.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.0, 0.25]
        );
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Color3::from_hex("#FF0000"), Some(Color3::RED));
        assert_eq!(Color3::from_hex("FF0000"), None);
        assert_eq!(Color3::from_hex("#GG0000"), None);
    }

    #[test]
    fn test_lerp_and_alpha() {
        let mid = Color3::BLACK.lerp(Color3::WHITE, 0.5);
        assert_eq!(mid, Color3::new(0.5, 0.5, 0.5));
        assert_eq!(Color4::from(mid), Color4::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&Color3::GREEN).unwrap();
        let parsed: Color3 = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Color3::GREEN);
    }
}
