use egui::{Color32, Pos2};

use crate::text::FontBook;
use super::{CanvasObject, ObjectKind};

/// Partial update for [`CanvasObject`]. Fields left `None` are untouched.
///
/// Text fields are ignored on non-text objects. Width and height of a text object are derived
/// from its content, so patching them directly has no lasting effect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPatch {
    pub center: Option<Pos2>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub content: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub color: Option<Color32>,
}

impl ObjectPatch {
    pub fn center(center: Pos2) -> Self {
        Self {
            center: Some(center),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Apply to `object`, re-measuring text synchronously when its text or font changed.
    pub(crate) fn apply(self, object: &mut CanvasObject, fonts: &FontBook) {
        let placement = &mut object.placement;
        if let Some(center) = self.center {
            placement.center = center;
        }
        if let Some(width) = self.width {
            placement.width = width;
        }
        if let Some(height) = self.height {
            placement.height = height;
        }
        if let Some(rotation) = self.rotation {
            placement.rotation = rotation;
        }

        if let ObjectKind::Text(text) = &mut object.kind {
            if let Some(color) = self.color {
                text.color = color;
            }
            let mut font_changed = false;
            if let Some(content) = self.content {
                text.content = content;
                font_changed = true;
            }
            if let Some(font_family) = self.font_family {
                text.font_family = font_family;
                font_changed = true;
            }
            if let Some(font_size) = self.font_size {
                text.font_size = font_size.max(1.0);
                font_changed = true;
            }
            if font_changed || self.width.is_some() || self.height.is_some() {
                object.remeasure(fonts);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::factory;
    use egui::pos2;

    #[test]
    fn test_content_change_remeasures() {
        let fonts = FontBook::new("sans-serif");
        let mut text = factory::create_text(
            &fonts,
            "Hi",
            "sans-serif",
            20.0,
            Color32::WHITE,
            pos2(0.0, 0.0),
        );
        let before = text.placement.width;
        ObjectPatch::content("Hello there").apply(&mut text, &fonts);
        assert!(text.placement.width > before);
        assert_eq!(text.as_text().map(|t| t.content.as_str()), Some("Hello there"));
    }

    #[test]
    fn test_direct_size_patch_on_text_is_overridden() {
        let fonts = FontBook::new("sans-serif");
        let mut text = factory::create_text(
            &fonts,
            "Hi",
            "sans-serif",
            20.0,
            Color32::WHITE,
            pos2(0.0, 0.0),
        );
        let measured = text.placement.size();
        ObjectPatch {
            width: Some(500.0),
            ..Default::default()
        }
        .apply(&mut text, &fonts);
        assert_eq!(text.placement.size(), measured);
    }

    #[test]
    fn test_text_fields_ignored_on_marker() {
        let fonts = FontBook::new("sans-serif");
        let mut marker = factory::create_marker(1, pos2(0.0, 0.0), 15.0);
        let before = marker.clone();
        ObjectPatch::content("nope").apply(&mut marker, &fonts);
        assert_eq!(marker, before);
    }
}
