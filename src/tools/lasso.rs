use egui::{Color32, Pos2};
use log::debug;
use tiny_skia::{LineCap, Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};

use crate::raster::{polygon_path, skia_color};

const MIN_VERTICES: usize = 3;
const OUTLINE_COLOR: Color32 = Color32::WHITE;
const OUTLINE_DASH: [f32; 2] = [6.0, 4.0];

/// What a click did to the polygon in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LassoClick {
    Added,
    /// The click landed on the first vertex of a polygon that can be closed.
    Closed,
}

/// Polygon accumulated click by click, filled into the paint layer once closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LassoTool {
    points: Vec<Pos2>,
    cursor: Option<Pos2>,
}

impl LassoTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn is_active(&self) -> bool {
        !self.points.is_empty()
    }

    /// Add a vertex at `point`, or report that the polygon should close when the click is within
    /// `close_radius` of the first vertex.
    pub fn click(&mut self, point: Pos2, close_radius: f32) -> LassoClick {
        if let Some(first) = self.points.first() {
            if self.points.len() >= MIN_VERTICES && first.distance(point) <= close_radius {
                return LassoClick::Closed;
            }
        }
        // The clicks leading up to a double-click land on the same spot; keep one vertex.
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
        self.cursor = Some(point);
        LassoClick::Added
    }

    /// Track the pointer for the rubber-band segment.
    pub fn hover(&mut self, point: Pos2) {
        self.cursor = Some(point);
    }

    /// End the polygon. Returns the vertices when there are enough to fill; otherwise the points
    /// are dropped silently.
    pub fn take_polygon(&mut self) -> Option<Vec<Pos2>> {
        self.cursor = None;
        let points = std::mem::take(&mut self.points);
        if points.len() < MIN_VERTICES {
            if !points.is_empty() {
                debug!("Discarding lasso with {} point(s)", points.len());
            }
            return None;
        }
        Some(points)
    }

    pub fn cancel(&mut self) {
        self.points.clear();
        self.cursor = None;
    }

    /// Dashed outline of the open polygon plus the segment to the cursor.
    pub fn draw_preview(&self, pixmap: &mut Pixmap, line_width: f32) {
        if self.points.is_empty() {
            return;
        }
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(skia_color(OUTLINE_COLOR, 1.0));
        let stroke = Stroke {
            width: line_width,
            line_cap: LineCap::Round,
            dash: StrokeDash::new(OUTLINE_DASH.to_vec(), 0.0),
            ..Default::default()
        };

        if let Some(path) = polygon_path(&self.points, false) {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        if let (Some(last), Some(cursor)) = (self.points.last(), self.cursor) {
            if *last != cursor {
                let mut pb = PathBuilder::new();
                pb.move_to(last.x, last.y);
                pb.line_to(cursor.x, cursor.y);
                if let Some(path) = pb.finish() {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
        }
    }
}
