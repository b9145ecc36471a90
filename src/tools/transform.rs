//! Move/rotate/scale/stretch of a single object.
//!
//! Every update is computed from the object as it was when the gesture began, so the result
//! does not drift with the number of pointer events.

use egui::{Pos2, Vec2, pos2, vec2};

use crate::geometry::{angle_between, rotate_vector, to_global, to_local};
use crate::gizmo::{Corner, Edge, Handle};
use crate::object::{CanvasObject, ObjectId, ObjectKind, ObjectPatch};
use crate::text::FontBook;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Move,
    Rotate,
    /// Uniform scale about the opposite corner.
    Scale(Corner),
    /// One-axis resize keeping the opposite edge in place.
    Stretch(Edge),
}

impl From<Handle> for TransformMode {
    fn from(handle: Handle) -> Self {
        match handle {
            Handle::Rotate => TransformMode::Rotate,
            Handle::Corner(corner) => TransformMode::Scale(corner),
            Handle::Edge(edge) => TransformMode::Stretch(edge),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformGesture {
    mode: TransformMode,
    start: CanvasObject,
    start_pointer: Pos2,
    /// Fixed point of a scale gesture: the corner opposite the dragged one.
    anchor: Pos2,
    start_angle: f32,
}

impl TransformGesture {
    /// Start transforming `object` with the pointer at the logical position `pointer`.
    pub fn begin(object: &CanvasObject, mode: TransformMode, pointer: Pos2) -> Self {
        let placement = &object.placement;
        let anchor = match mode {
            TransformMode::Scale(corner) => corner.opposite().position(placement),
            _ => placement.center,
        };
        Self {
            mode,
            start: object.clone(),
            start_pointer: pointer,
            anchor,
            start_angle: angle_between(placement.center, pointer),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.start.id
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    /// Absolute placement (and font size, for text) for the pointer at logical `pointer`.
    ///
    /// A logical delta equals the screen delta divided by the zoom, since pan does not change
    /// during a transform.
    pub fn update(&self, pointer: Pos2, fonts: &FontBook, min_size: f32) -> ObjectPatch {
        match self.mode {
            TransformMode::Move => {
                ObjectPatch::center(self.start.placement.center + (pointer - self.start_pointer))
            }
            TransformMode::Rotate => {
                let angle = angle_between(self.start.placement.center, pointer);
                ObjectPatch {
                    rotation: Some(self.start.placement.rotation + (angle - self.start_angle)),
                    ..Default::default()
                }
            }
            TransformMode::Scale(corner) => self.scale(corner, pointer, fonts, min_size),
            TransformMode::Stretch(edge) => self.stretch(edge, pointer, min_size),
        }
    }

    fn scale(&self, corner: Corner, pointer: Pos2, fonts: &FontBook, min_size: f32) -> ObjectPatch {
        let start = &self.start.placement;
        // Diagonal from the anchor to the dragged corner.
        let diagonal = (start.center - self.anchor) * 2.0;
        let length = diagonal.length();
        let mut factor = if length > f32::EPSILON {
            (pointer - self.anchor).dot(diagonal) / (length * length)
        } else {
            1.0
        };
        if !factor.is_finite() {
            factor = 1.0;
        }
        let smallest = start.width.min(start.height);
        if smallest > f32::EPSILON {
            factor = factor.max(min_size / smallest);
        }

        let mut patch = ObjectPatch::default();
        let size = match &self.start.kind {
            ObjectKind::Text(text) => {
                let font_size = (text.font_size * factor).max(1.0);
                patch.font_size = Some(font_size);
                fonts.measure(&text.content, &text.font_family, font_size)
            }
            ObjectKind::Image(_) | ObjectKind::Marker(_) => start.size() * factor,
        };
        let sign = corner.sign();
        let half = size * 0.5;
        let offset = rotate_vector(vec2(sign.x * half.x, sign.y * half.y), start.rotation);
        patch.center = Some(self.anchor + offset);
        patch.width = Some(size.x);
        patch.height = Some(size.y);
        patch
    }

    fn stretch(&self, edge: Edge, pointer: Pos2, min_size: f32) -> ObjectPatch {
        let start = &self.start.placement;
        let normal = edge.normal();
        let horizontal = normal.x != 0.0;
        let extent = if horizontal { start.width } else { start.height };

        let reach = to_local(pointer, start).to_vec2().dot(normal);
        let new_extent = (reach + extent * 0.5).max(min_size);
        let shift: Vec2 = normal * ((new_extent - extent) * 0.5);

        let mut patch = ObjectPatch::center(to_global(pos2(shift.x, shift.y), start));
        if horizontal {
            patch.width = Some(new_extent);
        } else {
            patch.height = Some(new_extent);
        }
        patch
    }
}
