use egui::{Color32, Pos2};
use tiny_skia::{Paint, Pixmap};

use crate::raster::{RasterLayer, StrokeMode, skia_color, stroke_points};

/// Brush appearance. The eraser only uses `width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushSettings {
    pub color: Color32,
    pub width: f32,
    pub opacity: f32,
}

/// One pointer-down to pointer-up drag of the brush or the eraser.
///
/// Brush segments accumulate at full strength in a coverage pixmap, which is composited over the
/// layer as it was when the drag began. Overlapping segments therefore keep a single opacity, and
/// each move only repaints the pixels its new segment can reach. The eraser clears pixels
/// directly.
#[derive(Clone, PartialEq)]
pub struct StrokeGesture {
    mode: StrokeMode,
    settings: BrushSettings,
    points: Vec<Pos2>,
    composite: Option<Composite>,
}

#[derive(Clone, PartialEq)]
struct Composite {
    base: Pixmap,
    coverage: Pixmap,
}

impl std::fmt::Debug for StrokeGesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrokeGesture")
            .field("mode", &self.mode)
            .field("settings", &self.settings)
            .field("points", &self.points.len())
            .finish_non_exhaustive()
    }
}

impl StrokeGesture {
    /// Start at `start`, which immediately leaves a dot on `raster`.
    pub fn begin(
        mode: StrokeMode,
        settings: BrushSettings,
        start: Pos2,
        raster: &mut RasterLayer,
    ) -> Self {
        let composite = match mode {
            StrokeMode::Paint => {
                let base = raster.pixmap().clone();
                let mut coverage = base.clone();
                coverage.fill(tiny_skia::Color::TRANSPARENT);
                Some(Composite { base, coverage })
            }
            StrokeMode::Erase => None,
        };
        let mut gesture = Self {
            mode,
            settings,
            points: vec![start],
            composite,
        };
        gesture.draw(raster, &[start]);
        gesture
    }

    /// Continue the stroke to `to`.
    pub fn extend(&mut self, raster: &mut RasterLayer, to: Pos2) {
        let Some(&from) = self.points.last() else {
            return;
        };
        if from == to {
            return;
        }
        self.points.push(to);
        self.draw(raster, &[from, to]);
    }

    fn draw(&mut self, raster: &mut RasterLayer, segment: &[Pos2]) {
        let BrushSettings { color, width, opacity } = self.settings;
        match &mut self.composite {
            None => raster.stroke_polyline(segment, width, color, opacity, self.mode),
            Some(Composite { base, coverage }) => {
                let Some(rect) = raster.dirty_rect(segment, width) else {
                    return;
                };
                let mut paint = Paint::default();
                paint.anti_alias = true;
                paint.set_color(skia_color(color, 1.0));
                stroke_points(coverage, segment, width, &paint);
                raster.composite_region(rect, base, coverage, opacity);
            }
        }
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn mode(&self) -> StrokeMode {
        self.mode
    }
}
