use egui::Pos2;

use crate::object::{CanvasObject, ObjectId};
use super::{Placement, to_local};

/// True when `point` lies inside the rotated rectangle, edges included.
pub fn contains_point(placement: &Placement, point: Pos2) -> bool {
    let local = to_local(point, placement);
    let half = placement.half_extents();
    local.x.abs() <= half.x && local.y.abs() <= half.y
}

/// Top-most object under `point`. Objects are scanned back to front so the last drawn wins.
pub fn hit_test(objects: &[CanvasObject], point: Pos2) -> Option<ObjectId> {
    objects
        .iter()
        .rev()
        .find(|object| contains_point(&object.placement, point))
        .map(|object| object.id)
}
