//! Handles drawn around the selected object and the hit-testing that picks a transform mode.

use egui::{Color32, Pos2, Vec2, pos2, vec2};

use crate::geometry::{Placement, to_global};
use crate::object::CanvasObject;

pub(crate) const HANDLE_COLOR: Color32 = Color32::from_rgb(30, 144, 255);
const OUTLINE_WIDTH_PX: f32 = 2.0;

/// A corner of the object's unrotated rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Direction of this corner from the center in local space, each component ±1.
    pub fn sign(self) -> Vec2 {
        match self {
            Corner::TopLeft => vec2(-1.0, -1.0),
            Corner::TopRight => vec2(1.0, -1.0),
            Corner::BottomRight => vec2(1.0, 1.0),
            Corner::BottomLeft => vec2(-1.0, 1.0),
        }
    }

    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::TopRight,
        }
    }

    /// Global position of this corner.
    pub fn position(self, placement: &Placement) -> Pos2 {
        let h = placement.half_extents();
        let s = self.sign();
        to_global(pos2(s.x * h.x, s.y * h.y), placement)
    }
}

/// The midpoint of one side of the object's unrotated rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

    /// Outward normal in local space.
    pub fn normal(self) -> Vec2 {
        match self {
            Edge::Top => vec2(0.0, -1.0),
            Edge::Right => vec2(1.0, 0.0),
            Edge::Bottom => vec2(0.0, 1.0),
            Edge::Left => vec2(-1.0, 0.0),
        }
    }

    pub fn position(self, placement: &Placement) -> Pos2 {
        let h = placement.half_extents();
        let n = self.normal();
        to_global(pos2(n.x * h.x, n.y * h.y), placement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Rotate,
    Corner(Corner),
    Edge(Edge),
}

/// Handle layout for the current zoom. Sizes are in logical units so handles keep a constant
/// on-screen size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gizmo {
    pub handle_radius: f32,
    pub rotate_offset: f32,
    pub line_width: f32,
}

impl Gizmo {
    /// Build from screen-pixel sizes at `zoom`.
    pub fn new(handle_radius_px: f32, rotate_offset_px: f32, zoom: f32) -> Self {
        Self {
            handle_radius: handle_radius_px / zoom,
            rotate_offset: rotate_offset_px / zoom,
            line_width: OUTLINE_WIDTH_PX / zoom,
        }
    }

    pub fn rotate_handle_position(&self, placement: &Placement) -> Pos2 {
        to_global(pos2(0.0, -placement.height * 0.5 - self.rotate_offset), placement)
    }

    /// Every handle of `object` with its global position, in hit-test priority order.
    pub fn handles(&self, object: &CanvasObject) -> Vec<(Handle, Pos2)> {
        let placement = &object.placement;
        let mut handles = Vec::with_capacity(9);
        handles.push((Handle::Rotate, self.rotate_handle_position(placement)));
        handles.extend(Corner::ALL.iter().map(|&c| (Handle::Corner(c), c.position(placement))));
        if object.supports_stretch() {
            handles.extend(Edge::ALL.iter().map(|&e| (Handle::Edge(e), e.position(placement))));
        }
        handles
    }

    /// Handle under `point`, if any.
    pub fn handle_at(&self, object: &CanvasObject, point: Pos2) -> Option<Handle> {
        self.handles(object)
            .into_iter()
            .find(|(_, pos)| pos.distance(point) <= self.handle_radius)
            .map(|(handle, _)| handle)
    }
}
