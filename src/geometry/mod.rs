//! Rotation and local/global coordinate math shared by hit-testing, the gizmo and the
//! transform tool. Everything here is pure.

pub mod hit_testing;

use egui::emath::Rot2;
use egui::{Pos2, Rect, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};

pub use hit_testing::{contains_point, hit_test};

/// Where an object sits on the logical canvas: its center, unrotated size and rotation
/// (radians, about the center).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub center: Pos2,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
}

impl Placement {
    pub fn new(center: Pos2, size: Vec2) -> Self {
        Self {
            center,
            width: size.x,
            height: size.y,
            rotation: 0.0,
        }
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    pub fn half_extents(&self) -> Vec2 {
        self.size() * 0.5
    }

    /// The four corners in global coordinates, clockwise from top-left.
    pub fn corners(&self) -> [Pos2; 4] {
        let h = self.half_extents();
        [
            to_global(pos2(-h.x, -h.y), self),
            to_global(pos2(h.x, -h.y), self),
            to_global(pos2(h.x, h.y), self),
            to_global(pos2(-h.x, h.y), self),
        ]
    }

    /// Axis-aligned bounds of the rotated rectangle.
    pub fn bounding_rect(&self) -> Rect {
        Rect::from_points(&self.corners())
    }
}

/// Standard 2D rotation. With the canvas y axis pointing down, a positive angle turns clockwise
/// on screen, matching how objects are drawn.
pub fn rotate_vector(v: Vec2, angle: f32) -> Vec2 {
    Rot2::from_angle(angle) * v
}

/// Express a canvas point in the object's local frame (origin at its center, axes along its edges).
pub fn to_local(point: Pos2, placement: &Placement) -> Pos2 {
    rotate_vector(point - placement.center, -placement.rotation).to_pos2()
}

/// Inverse of [`to_local`].
pub fn to_global(local: Pos2, placement: &Placement) -> Pos2 {
    placement.center + rotate_vector(local.to_vec2(), placement.rotation)
}

/// Angle of the vector from `center` to `point`, in radians.
pub fn angle_between(center: Pos2, point: Pos2) -> f32 {
    let d = point - center;
    d.y.atan2(d.x)
}
