//! Compositing of the scene onto tiny-skia pixmaps: the live frame at logical resolution and the
//! flattened export at the background's native resolution.

use egui::{Color32, Vec2, vec2};
use log::{debug, info};
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::asset::AssetRegistry;
use crate::document::Document;
use crate::error::EditorResult;
use crate::gizmo::{Edge, Gizmo, HANDLE_COLOR};
use crate::object::{CanvasObject, ObjectKind};
use crate::raster::{new_pixmap, polygon_path, skia_color};
use crate::text::FontBook;
use crate::tools::LassoTool;

/// Marker label size relative to the marker radius.
const MARKER_LABEL_SCALE: f32 = 1.1;

fn bilinear() -> PixmapPaint {
    PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..Default::default()
    }
}

/// Draws scene objects. Holds only styling, so one renderer serves every pass.
#[derive(Debug, Clone)]
pub struct Renderer {
    marker_color: Color32,
    marker_label_color: Color32,
    selection_color: Color32,
}

impl Renderer {
    pub fn new(marker_color: Color32) -> Self {
        Self {
            marker_color,
            marker_label_color: Color32::WHITE,
            selection_color: HANDLE_COLOR,
        }
    }

    /// Draw `object` with every logical coordinate and size multiplied by `scale`.
    ///
    /// The object is drawn centered on its (scaled) center, rotated about it. Images whose asset
    /// is gone are skipped.
    pub fn draw_object(
        &self,
        target: &mut Pixmap,
        object: &CanvasObject,
        assets: &AssetRegistry,
        fonts: &FontBook,
        scale: Vec2,
    ) {
        let placement = &object.placement;
        let size = vec2(placement.width * scale.x, placement.height * scale.y);
        if size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        let transform =
            Transform::from_translate(placement.center.x * scale.x, placement.center.y * scale.y)
                .pre_rotate(placement.rotation.to_degrees());

        match &object.kind {
            ObjectKind::Image(image) => {
                let Some(asset) = assets.get(image.asset_id) else {
                    debug!("Asset {} missing, skipping object {}", image.asset_id, object.id);
                    return;
                };
                draw_centered(target, asset.display(), size, transform);
            }
            ObjectKind::Text(text) => {
                let font_size = text.font_size * scale.y;
                if let Some(pixmap) =
                    fonts.rasterize(&text.content, &text.font_family, font_size, text.color)
                {
                    draw_centered(target, &pixmap, size, transform);
                }
            }
            ObjectKind::Marker(marker) => {
                let radius = size.x.min(size.y) * 0.5;
                let mut paint = Paint::default();
                paint.anti_alias = true;
                paint.set_color(skia_color(self.marker_color, 1.0));
                if let Some(circle) = PathBuilder::from_circle(0.0, 0.0, radius) {
                    target.fill_path(&circle, &paint, FillRule::Winding, transform, None);
                }

                let label = marker.number.to_string();
                let family = fonts.default_family();
                let font_size = radius * MARKER_LABEL_SCALE;
                if let Some(pixmap) =
                    fonts.rasterize(&label, family, font_size, self.marker_label_color)
                {
                    // Shrink wide labels so they stay inside the circle.
                    let natural = vec2(pixmap.width() as f32, pixmap.height() as f32);
                    let fit = (radius * 2.0 * 0.8 / natural.x).min(1.0);
                    draw_centered(target, &pixmap, natural * fit, transform);
                }
            }
        }
    }

    /// Clear `target` and draw every object in paint order at logical scale.
    pub fn render_objects(
        &self,
        target: &mut Pixmap,
        objects: &[CanvasObject],
        assets: &AssetRegistry,
        fonts: &FontBook,
    ) {
        target.fill(Color::TRANSPARENT);
        for object in objects {
            self.draw_object(target, object, assets, fonts, Vec2::splat(1.0));
        }
    }

    /// Outline and handles of the selected object.
    pub fn draw_selection(&self, target: &mut Pixmap, object: &CanvasObject, gizmo: &Gizmo) {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(skia_color(self.selection_color, 1.0));
        let stroke = Stroke {
            width: gizmo.line_width,
            ..Default::default()
        };

        let placement = &object.placement;
        if let Some(outline) = polygon_path(&placement.corners(), true) {
            target.stroke_path(&outline, &paint, &stroke, Transform::identity(), None);
        }
        let top = Edge::Top.position(placement);
        let rotate = gizmo.rotate_handle_position(placement);
        if let Some(stem) = polygon_path(&[top, rotate], false) {
            target.stroke_path(&stem, &paint, &stroke, Transform::identity(), None);
        }

        let mut fill = Paint::default();
        fill.anti_alias = true;
        fill.set_color(Color::WHITE);
        for (_, pos) in gizmo.handles(object) {
            if let Some(dot) = PathBuilder::from_circle(pos.x, pos.y, gizmo.handle_radius * 0.5) {
                target.fill_path(&dot, &fill, FillRule::Winding, Transform::identity(), None);
                target.stroke_path(&dot, &paint, &stroke, Transform::identity(), None);
            }
        }
    }

    /// Everything the user sees, at logical resolution: background, objects, paint layer, the
    /// lasso in progress and the selection gizmo.
    pub fn render_frame(
        &self,
        background: &Pixmap,
        document: &Document,
        assets: &AssetRegistry,
        lasso: &LassoTool,
        gizmo: &Gizmo,
    ) -> EditorResult<Pixmap> {
        let raster = document.raster();
        let mut frame = new_pixmap(raster.width(), raster.height())?;
        let fit = Transform::from_scale(
            raster.width() as f32 / background.width() as f32,
            raster.height() as f32 / background.height() as f32,
        );
        frame.draw_pixmap(0, 0, background.as_ref(), &bilinear(), fit, None);

        for object in document.objects() {
            self.draw_object(&mut frame, object, assets, document.fonts(), Vec2::splat(1.0));
        }
        frame.draw_pixmap(
            0,
            0,
            raster.pixmap().as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        lasso.draw_preview(&mut frame, gizmo.line_width);
        if let Some(selected) = document.selected_object() {
            self.draw_selection(&mut frame, selected, gizmo);
        }
        Ok(frame)
    }

    /// Flatten the scene at the background's native resolution.
    ///
    /// Object positions, sizes and text sizes are multiplied by the ratio between the background
    /// and the logical canvas; the paint layer is stretched over the result last.
    pub fn export(
        &self,
        background: &Pixmap,
        document: &Document,
        assets: &AssetRegistry,
    ) -> EditorResult<Pixmap> {
        let raster = document.raster();
        let scale = vec2(
            background.width() as f32 / raster.width() as f32,
            background.height() as f32 / raster.height() as f32,
        );
        let mut output = background.clone();
        for object in document.objects() {
            self.draw_object(&mut output, object, assets, document.fonts(), scale);
        }
        output.draw_pixmap(
            0,
            0,
            raster.pixmap().as_ref(),
            &bilinear(),
            Transform::from_scale(scale.x, scale.y),
            None,
        );
        info!(
            "📤 Exported {}x{} ({} objects, scale {:.2}x{:.2})",
            output.width(),
            output.height(),
            document.objects().len(),
            scale.x,
            scale.y
        );
        Ok(output)
    }
}

/// Draw `source` stretched to `size` and centered on the origin of `transform`.
fn draw_centered(target: &mut Pixmap, source: &Pixmap, size: Vec2, transform: Transform) {
    let sw = source.width() as f32;
    let sh = source.height() as f32;
    let transform = transform
        .pre_scale(size.x / sw, size.y / sh)
        .pre_translate(-sw * 0.5, -sh * 0.5);
    target.draw_pixmap(0, 0, source.as_ref(), &bilinear(), transform, None);
}
