use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::EditorResult;

/// Tunables for one editing session.
///
/// Every field has a default, so a host only needs to override what it cares about:
///
/// ```
/// let config = layer_canvas::EditorConfig::from_json(r#"{ "max_zoom": 8.0 }"#).unwrap();
/// assert_eq!(config.max_zoom, 8.0);
/// assert_eq!(config.min_zoom, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom multiplier applied per scroll notch.
    pub scroll_zoom_step: f32,

    /// The background is fit into this box (never upscaled) to get the logical canvas size.
    pub max_logical_width: u32,
    pub max_logical_height: u32,

    pub brush_color: Color32,
    pub brush_width: f32,
    pub brush_opacity: f32,
    pub eraser_width: f32,

    pub lasso_fill_color: Color32,
    pub lasso_fill_opacity: f32,
    /// Screen pixels around the first vertex that close the polygon on click.
    pub lasso_close_radius: f32,

    /// Screen pixels.
    pub handle_radius: f32,
    /// Screen pixels between the top edge and the rotate handle.
    pub rotate_handle_offset: f32,

    pub min_object_size: f32,
    pub duplicate_offset: f32,

    pub marker_radius: f32,
    pub marker_color: Color32,
    pub max_marker_number: u32,

    pub default_font_family: String,
    pub default_font_size: f32,
    pub default_text_color: Color32,
    pub default_text: String,

    /// Maximum number of snapshots kept; `None` keeps everything.
    pub history_limit: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 5.0,
            scroll_zoom_step: 1.1,
            max_logical_width: 1024,
            max_logical_height: 768,
            brush_color: Color32::from_rgb(255, 0, 0),
            brush_width: 20.0,
            brush_opacity: 0.6,
            eraser_width: 30.0,
            lasso_fill_color: Color32::from_rgb(255, 0, 0),
            lasso_fill_opacity: 0.6,
            lasso_close_radius: 10.0,
            handle_radius: 10.0,
            rotate_handle_offset: 30.0,
            min_object_size: 10.0,
            duplicate_offset: 20.0,
            marker_radius: 15.0,
            marker_color: Color32::from_rgb(229, 57, 53),
            max_marker_number: 10,
            default_font_family: "sans-serif".to_owned(),
            default_font_size: 32.0,
            default_text_color: Color32::WHITE,
            default_text: "Text".to_owned(),
            history_limit: None,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON configuration and clamp it into a usable range.
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Clamp values that would break the viewport or the transform math.
    pub fn validated(mut self) -> Self {
        self.min_zoom = self.min_zoom.max(0.01);
        self.max_zoom = self.max_zoom.max(self.min_zoom);
        self.scroll_zoom_step = self.scroll_zoom_step.max(1.001);
        self.max_logical_width = self.max_logical_width.max(1);
        self.max_logical_height = self.max_logical_height.max(1);
        self.brush_width = self.brush_width.max(1.0);
        self.eraser_width = self.eraser_width.max(1.0);
        self.brush_opacity = self.brush_opacity.clamp(0.0, 1.0);
        self.lasso_fill_opacity = self.lasso_fill_opacity.clamp(0.0, 1.0);
        self.min_object_size = self.min_object_size.max(1.0);
        self.marker_radius = self.marker_radius.max(1.0);
        self.default_font_size = self.default_font_size.max(1.0);
        self.max_marker_number = self.max_marker_number.max(1);
        if let Some(limit) = self.history_limit.as_mut() {
            *limit = (*limit).max(1);
        }
        self
    }
}
