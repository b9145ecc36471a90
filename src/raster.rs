use egui::{Color32, Pos2, Vec2, vec2};
use log::debug;
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, IntRect, LineCap, LineJoin, Paint, PathBuilder,
    Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::error::{EditorError, EditorResult};

/// How a stroke combines with the paint layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeMode {
    /// Source-over painting.
    Paint,
    /// Removes coverage from the layer instead of adding to it.
    Erase,
}

/// Convert an egui color to tiny-skia, multiplying its alpha by `opacity`.
pub(crate) fn skia_color(color: Color32, opacity: f32) -> Color {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let alpha = (a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
    Color::from_rgba8(r, g, b, alpha)
}

pub(crate) fn new_pixmap(width: u32, height: u32) -> EditorResult<Pixmap> {
    Pixmap::new(width, height).ok_or(EditorError::InvalidDimensions { width, height })
}

/// The freehand/lasso pixel layer, the same size as the logical canvas.
#[derive(Clone, PartialEq)]
pub struct RasterLayer {
    pixmap: Pixmap,
}

impl std::fmt::Debug for RasterLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterLayer")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish_non_exhaustive()
    }
}

impl RasterLayer {
    pub fn new(width: u32, height: u32) -> EditorResult<Self> {
        Ok(Self {
            pixmap: new_pixmap(width, height)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.width() as f32, self.height() as f32)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Raw premultiplied RGBA bytes.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Overwrite every pixel with `bytes`, which must come from a layer of the same size.
    pub(crate) fn restore(&mut self, bytes: &[u8]) {
        let data = self.pixmap.data_mut();
        if data.len() == bytes.len() {
            data.copy_from_slice(bytes);
        } else {
            debug!(
                "Ignoring raster restore with mismatched length {} != {}",
                bytes.len(),
                data.len()
            );
        }
    }

    /// True when no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// A round-capped, round-joined polyline drawn as one path, so overlapping segments do not
    /// stack their opacity. A single point draws a dot.
    pub fn stroke_polyline(
        &mut self,
        points: &[Pos2],
        width: f32,
        color: Color32,
        opacity: f32,
        mode: StrokeMode,
    ) {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        match mode {
            StrokeMode::Paint => paint.set_color(skia_color(color, opacity)),
            StrokeMode::Erase => {
                paint.set_color(Color::BLACK);
                paint.blend_mode = BlendMode::Clear;
            }
        }
        stroke_points(&mut self.pixmap, points, width, &paint);
    }

    /// Reset `rect` to the pixels of `base`, then composite `coverage` over it at `opacity`.
    ///
    /// `base` and `coverage` must be the size of the layer.
    pub(crate) fn composite_region(
        &mut self,
        rect: IntRect,
        base: &Pixmap,
        coverage: &Pixmap,
        opacity: f32,
    ) {
        let stride = self.pixmap.width() as usize * 4;
        let left = rect.x() as usize * 4;
        let right = left + rect.width() as usize * 4;
        let data = self.pixmap.data_mut();
        if base.data().len() != data.len() {
            debug!("Ignoring composite from a base of another size");
            return;
        }
        for row in rect.y() as usize..rect.y() as usize + rect.height() as usize {
            let span = row * stride + left..row * stride + right;
            data[span.clone()].copy_from_slice(&base.data()[span]);
        }

        let Some(patch) = coverage.clone_rect(rect) else {
            return;
        };
        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0),
            ..Default::default()
        };
        self.pixmap
            .draw_pixmap(rect.x(), rect.y(), patch.as_ref(), &paint, Transform::identity(), None);
    }

    /// Pixels a round-capped stroke of `width` through `points` can touch, clipped to the layer.
    pub(crate) fn dirty_rect(&self, points: &[Pos2], width: f32) -> Option<IntRect> {
        let first = points.first()?;
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        // One extra pixel for anti-aliasing.
        let margin = width * 0.5 + 1.0;
        let left = (min.x - margin).floor().max(0.0) as i32;
        let top = (min.y - margin).floor().max(0.0) as i32;
        let right = ((max.x + margin).ceil() as i32).min(self.width() as i32);
        let bottom = ((max.y + margin).ceil() as i32).min(self.height() as i32);
        IntRect::from_ltrb(left, top, right, bottom)
    }

    /// Fill a closed polygon. Fewer than three points draws nothing and returns `false`.
    pub fn fill_polygon(&mut self, points: &[Pos2], color: Color32, opacity: f32) -> bool {
        let Some(path) = polygon_path(points, true) else {
            return false;
        };
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(skia_color(color, opacity));
        self.pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        true
    }

    /// Paint `source` stretched over the whole layer, used to seed it from a saved mask.
    pub fn draw_scaled(&mut self, source: &Pixmap) {
        let sx = self.width() as f32 / source.width() as f32;
        let sy = self.height() as f32 / source.height() as f32;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..Default::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, Transform::from_scale(sx, sy), None);
    }
}

/// Stroke `points` with round caps and joins. Coincident points draw a dot.
pub(crate) fn stroke_points(pixmap: &mut Pixmap, points: &[Pos2], width: f32, paint: &Paint<'_>) {
    let Some(first) = points.first() else {
        return;
    };
    if points.iter().all(|p| (*p - *first).length() <= f32::EPSILON) {
        // Degenerate path: render its round cap.
        if let Some(dot) = PathBuilder::from_circle(first.x, first.y, width * 0.5) {
            pixmap.fill_path(&dot, paint, FillRule::Winding, Transform::identity(), None);
        }
        return;
    }

    let Some(path) = polygon_path(points, false) else {
        return;
    };
    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, paint, &stroke, Transform::identity(), None);
}

/// Polyline (optionally closed) through `points`. Needs at least two points, three when closed.
pub(crate) fn polygon_path(points: &[Pos2], close: bool) -> Option<tiny_skia::Path> {
    let min_points = if close { 3 } else { 2 };
    if points.len() < min_points {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(points[0].x, points[0].y);
    for p in &points[1..] {
        pb.line_to(p.x, p.y);
    }
    if close {
        pb.close();
    }
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn alpha_at(layer: &RasterLayer, x: u32, y: u32) -> u8 {
        layer.pixmap().pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    #[test]
    fn test_overlapping_segments_keep_one_opacity() {
        let mut layer = RasterLayer::new(50, 50).unwrap();
        let points = [pos2(5.0, 25.0), pos2(25.0, 25.0), pos2(26.0, 25.0), pos2(45.0, 25.0)];
        layer.stroke_polyline(&points, 10.0, Color32::RED, 0.6, StrokeMode::Paint);
        let alpha = alpha_at(&layer, 25, 25);
        assert!((150..=155).contains(&alpha), "alpha was {alpha}");
        assert_eq!(alpha_at(&layer, 25, 5), 0);
    }

    #[test]
    fn test_eraser_clears() {
        let mut layer = RasterLayer::new(50, 50).unwrap();
        let square = [pos2(0.0, 0.0), pos2(50.0, 0.0), pos2(50.0, 50.0), pos2(0.0, 50.0)];
        layer.fill_polygon(&square, Color32::RED, 1.0);
        assert_eq!(alpha_at(&layer, 25, 25), 255);
        let line = [pos2(5.0, 25.0), pos2(45.0, 25.0)];
        layer.stroke_polyline(&line, 10.0, Color32::RED, 1.0, StrokeMode::Erase);
        assert_eq!(alpha_at(&layer, 25, 25), 0);
        assert_eq!(alpha_at(&layer, 25, 5), 255);
    }

    #[test]
    fn test_dirty_rect_is_clipped_to_the_layer() {
        let layer = RasterLayer::new(50, 40).unwrap();
        let rect = layer.dirty_rect(&[pos2(10.0, 10.0), pos2(20.0, 12.0)], 4.0).unwrap();
        assert_eq!((rect.left(), rect.top(), rect.right(), rect.bottom()), (7, 7, 23, 15));
        let clipped = layer.dirty_rect(&[pos2(-5.0, 38.0)], 10.0).unwrap();
        assert_eq!(
            (clipped.left(), clipped.top(), clipped.right(), clipped.bottom()),
            (0, 32, 1, 40)
        );
        assert!(layer.dirty_rect(&[pos2(-50.0, -50.0)], 4.0).is_none());
    }

    #[test]
    fn test_composite_region_only_touches_the_rect() {
        let mut layer = RasterLayer::new(20, 20).unwrap();
        let base = layer.pixmap().clone();
        let mut coverage = base.clone();
        coverage.fill(Color::from_rgba8(255, 0, 0, 255));
        let rect = IntRect::from_xywh(5, 5, 4, 4).unwrap();

        layer.composite_region(rect, &base, &coverage, 0.6);
        assert!((150..=155).contains(&alpha_at(&layer, 6, 6)));
        assert_eq!(alpha_at(&layer, 10, 6), 0);

        // Compositing twice starts from the base again
        layer.composite_region(rect, &base, &coverage, 0.6);
        assert!((150..=155).contains(&alpha_at(&layer, 6, 6)));
    }

    #[test]
    fn test_polygon_needs_three_points() {
        let mut layer = RasterLayer::new(20, 20).unwrap();
        assert!(!layer.fill_polygon(&[pos2(0.0, 0.0), pos2(10.0, 10.0)], Color32::RED, 1.0));
        assert!(layer.is_blank());
    }

    #[test]
    fn test_restore_is_byte_exact() {
        let mut layer = RasterLayer::new(20, 20).unwrap();
        let blank = layer.data().to_vec();
        let line = [pos2(2.0, 2.0), pos2(18.0, 18.0)];
        layer.stroke_polyline(&line, 4.0, Color32::BLUE, 0.6, StrokeMode::Paint);
        assert!(!layer.is_blank());
        layer.restore(&blank);
        assert!(layer.is_blank());
    }
}
