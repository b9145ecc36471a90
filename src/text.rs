//! Font registry used to measure and rasterize text objects and marker labels.

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use egui::{Color32, Vec2, vec2};
use log::debug;
use std::collections::HashMap;
use tiny_skia::{ColorU8, Pixmap};

use crate::error::{EditorError, EditorResult};

/// Advance per character, relative to the font size, when no font is registered.
const APPROX_ADVANCE: f32 = 0.6;
/// Line height relative to the font size when no font is registered.
const APPROX_LINE_HEIGHT: f32 = 1.2;

/// Fonts keyed by family name.
///
/// Lookups fall back to the default family, then to any registered font. With no fonts at all,
/// measurement uses a fixed-advance approximation so every text object still has a size.
#[derive(Clone)]
pub struct FontBook {
    fonts: HashMap<String, FontArc>,
    default_family: String,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<_> = self.fonts.keys().collect();
        families.sort();
        f.debug_struct("FontBook")
            .field("families", &families)
            .field("default_family", &self.default_family)
            .finish()
    }
}

impl FontBook {
    pub fn new(default_family: &str) -> Self {
        Self {
            fonts: HashMap::new(),
            default_family: default_family.to_owned(),
        }
    }

    /// Register TTF/OTF bytes under `family`, replacing any previous font of that name.
    pub fn register(&mut self, family: &str, bytes: Vec<u8>) -> EditorResult<()> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|_| EditorError::InvalidFont(family.to_owned()))?;
        debug!("Registered font family {family:?}");
        self.fonts.insert(family.to_owned(), font);
        Ok(())
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    pub fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    fn font_for(&self, family: &str) -> Option<&FontArc> {
        self.fonts
            .get(family)
            .or_else(|| self.fonts.get(&self.default_family))
            .or_else(|| self.fonts.values().next())
    }

    /// Size of `content` laid out in `family` at `font_size`. Lines are split on `\n`.
    pub fn measure(&self, content: &str, family: &str, font_size: f32) -> Vec2 {
        let line_count = content.split('\n').count() as f32;
        let size = match self.font_for(family) {
            Some(font) => {
                let scaled = font.as_scaled(font_size);
                let width = content
                    .split('\n')
                    .map(|line| layout_line(font, font_size, line).1)
                    .fold(0.0, f32::max);
                vec2(width, scaled.height() * line_count)
            }
            None => {
                let longest = content
                    .split('\n')
                    .map(|line| line.chars().count())
                    .max()
                    .unwrap_or(0);
                vec2(
                    longest as f32 * font_size * APPROX_ADVANCE,
                    font_size * APPROX_LINE_HEIGHT * line_count,
                )
            }
        };
        size.max(Vec2::splat(1.0))
    }

    /// Rasterize `content` into a pixmap exactly the measured size, top-left aligned.
    ///
    /// Returns `None` when no font is registered.
    pub fn rasterize(
        &self,
        content: &str,
        family: &str,
        font_size: f32,
        color: Color32,
    ) -> Option<Pixmap> {
        let Some(font) = self.font_for(family) else {
            debug!("No font registered, skipping text {content:?}");
            return None;
        };
        let size = self.measure(content, family, font_size);
        let mut pixmap = Pixmap::new(size.x.ceil() as u32, size.y.ceil() as u32)?;
        let width = pixmap.width() as i32;
        let height = pixmap.height() as i32;
        let [r, g, b, a] = color.to_srgba_unmultiplied();

        let scaled = font.as_scaled(font_size);
        let pixels = pixmap.pixels_mut();
        for (row, line) in content.split('\n').enumerate() {
            let baseline = row as f32 * scaled.height() + scaled.ascent();
            let (glyphs, _) = layout_line(font, font_size, line);
            for (id, x) in glyphs {
                let glyph = id.with_scale_and_position(font_size, point(x, baseline));
                let Some(outlined) = font.outline_glyph(glyph) else {
                    continue;
                };
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = bounds.min.x as i32 + gx as i32;
                    let py = bounds.min.y as i32 + gy as i32;
                    if px < 0 || py < 0 || px >= width || py >= height {
                        return;
                    }
                    let alpha = (coverage.clamp(0.0, 1.0) * a as f32).round() as u8;
                    let index = (py * width + px) as usize;
                    if alpha > pixels[index].alpha() {
                        pixels[index] = ColorU8::from_rgba(r, g, b, alpha).premultiply();
                    }
                });
            }
        }
        Some(pixmap)
    }
}

/// Glyph ids with their pen x offsets, and the total advance of the line.
fn layout_line(font: &FontArc, font_size: f32, line: &str) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::with_capacity(line.len());
    let mut cursor_x = 0.0f32;
    let mut last: Option<GlyphId> = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor_x += scaled.kern(prev, id);
        }
        glyphs.push((id, cursor_x));
        cursor_x += scaled.h_advance(id);
        last = Some(id);
    }
    (glyphs, cursor_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate_measure_without_fonts() {
        let fonts = FontBook::new("sans-serif");
        let size = fonts.measure("abcd", "sans-serif", 10.0);
        assert!((size.x - 24.0).abs() < 1e-4);
        assert!((size.y - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_multiline_uses_longest_line() {
        let fonts = FontBook::new("sans-serif");
        let size = fonts.measure("ab\nabcdef\nc", "serif", 10.0);
        assert!((size.x - 36.0).abs() < 1e-4);
        assert!((size.y - 36.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_text_has_minimum_size() {
        let fonts = FontBook::new("sans-serif");
        assert_eq!(fonts.measure("", "sans-serif", 10.0).x, 1.0);
    }

    #[test]
    fn test_rasterize_without_fonts_is_none() {
        let fonts = FontBook::new("sans-serif");
        assert!(fonts.rasterize("hi", "sans-serif", 12.0, Color32::WHITE).is_none());
    }

    fn mono() -> FontBook {
        let mut fonts = FontBook::new("sans-serif");
        let bytes = include_bytes!("../tests/fixtures/DejaVuSansMono.ttf").to_vec();
        fonts.register("mono", bytes).unwrap();
        fonts
    }

    #[test]
    fn test_measure_uses_font_metrics() {
        let fonts = mono();
        let one = fonts.measure("ab", "mono", 20.0);
        let two = fonts.measure("abcd", "mono", 20.0);
        assert!((two.x - one.x * 2.0).abs() < 1e-3);
        // Line height is the pixel scale itself
        assert!((one.y - 20.0).abs() < 1e-3);

        let approx = FontBook::new("sans-serif").measure("abcd", "mono", 20.0);
        assert!((two.x - approx.x).abs() > 1.0);

        let doubled = fonts.measure("abcd", "mono", 40.0);
        assert!((doubled.x - two.x * 2.0).abs() < 1e-3);
        assert!((fonts.measure("ab\ncd", "mono", 20.0).y - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_family_falls_back_to_registered_font() {
        let fonts = mono();
        assert_eq!(fonts.measure("Hello", "cursive", 16.0), fonts.measure("Hello", "mono", 16.0));
    }

    #[test]
    fn test_rasterize_fills_the_measured_box() {
        let fonts = mono();
        let size = fonts.measure("Hi", "mono", 40.0);
        let pixmap = fonts.rasterize("Hi", "mono", 40.0, Color32::WHITE).unwrap();
        assert_eq!(pixmap.width(), size.x.ceil() as u32);
        assert_eq!(pixmap.height(), size.y.ceil() as u32);

        let opaque = pixmap.pixels().iter().filter(|p| p.alpha() == 255).count();
        assert!(opaque > 20, "only {opaque} opaque pixels");
        assert_eq!(pixmap.pixel(0, 0).map(|p| p.alpha()), Some(0));
    }

    #[test]
    fn test_garbage_font_is_rejected() {
        let mut fonts = FontBook::new("sans-serif");
        assert!(fonts.register("broken", vec![1, 2, 3]).is_err());
        assert!(!fonts.has_fonts());
    }
}
